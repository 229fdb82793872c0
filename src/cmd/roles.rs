#[derive(clap::Args, Debug)]
pub struct RolesArgs {
    /// Role profile name; roles are listed for its OneLogin app
    pub alias: String,
}

#[tokio::main(flavor = "current_thread")]
pub async fn run(global: &crate::cmd::GlobalArgs, args: &RolesArgs) -> Result<(), anyhow::Error> {
    let config = global.load_config().await?;
    let resolved = config.resolve(&args.alias)?;
    let cache = crate::cache::CacheStore::load(crate::config::cache_path()).await;

    match cache.assertion(resolved.app_id) {
        Ok((_, roles)) => {
            for role in roles {
                println!("{role}");
            }
            Ok(())
        }
        Err(e) if e.is_cache_miss() => {
            tracing::debug!(err = %e, app_id = resolved.app_id, "no usable assertion");
            let product = env!("CARGO_PKG_NAME");
            let alias = &args.alias;
            eprint!(
                "{}",
                indoc::formatdoc! {"
                    :: {product} :: Login required to list roles for {alias} :::::::
                    :: {product} :: > Use the following command to continue
                    :: {product} ::   $ {product} login {alias}
                "}
            );
            Err(crate::Error::FailureButSilentlyExit.into())
        }
        Err(e) => Err(e.into()),
    }
}
