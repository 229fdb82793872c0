#[derive(clap::Args, Debug)]
pub struct FlushArgs {
    /// Role profile name whose stored credentials are invalidated
    pub alias: String,
}

#[tokio::main(flavor = "current_thread")]
pub async fn run(args: &FlushArgs) -> Result<(), anyhow::Error> {
    use crate::secret_store::SecretStore;
    let store = crate::secret_store::KeyringSecretStore::default();
    store.flush_session(&args.alias, chrono::Utc::now()).await?;
    let product = env!("CARGO_PKG_NAME");
    eprintln!(":: {product} :: Flushed credentials for {}", args.alias);
    Ok(())
}
