#[derive(clap::Args, Debug)]
pub struct OAuthArgs {
    #[command(subcommand)]
    pub command: OAuthCommand,
}

#[derive(clap::Subcommand, Debug)]
pub enum OAuthCommand {
    /// Store OneLogin API client credentials
    Set,
    /// Show the stored OneLogin API client credentials
    Show,
}

#[tokio::main(flavor = "current_thread")]
pub async fn run(args: &OAuthArgs) -> Result<(), anyhow::Error> {
    use crate::secret_store::SecretStore;
    let store = crate::secret_store::KeyringSecretStore::default();
    match args.command {
        OAuthCommand::Set => {
            let prompter = crate::prompt::TerminalPrompter;
            let config = ask_oauth_config(&prompter)?;
            store.save_oauth_config(&config).await?;
            let product = env!("CARGO_PKG_NAME");
            eprintln!(":: {product} :: Stored OneLogin API credentials");
        }
        OAuthCommand::Show => {
            let config = store.load_oauth_config().await?;
            println!("ClientID: {}", config.client_id.as_str());
            println!("ClientSecret: {}", config.masked_secret());
        }
    }
    Ok(())
}

/// Asks until both values are exactly [crate::ext_oauth2::CLIENT_CREDENTIAL_LENGTH] characters.
fn ask_oauth_config(
    prompter: &(impl crate::prompt::Prompter + ?Sized),
) -> crate::Result<crate::ext_oauth2::OAuthConfig> {
    use secrecy::ExposeSecret;
    let len = crate::ext_oauth2::CLIENT_CREDENTIAL_LENGTH;
    let client_id = loop {
        let s = prompter.text("OneLogin Client ID")?;
        let s = s.trim();
        if s.chars().count() == len {
            break s.to_owned();
        }
        prompter.notice(&format!("Client ID must be {len} characters"));
    };
    let secret = loop {
        let s = prompter.password("OneLogin Client Secret")?;
        let s = s.expose_secret().trim();
        if s.chars().count() == len {
            break s.to_owned();
        }
        prompter.notice(&format!("Client Secret must be {len} characters"));
    };
    crate::ext_oauth2::OAuthConfig::new(client_id, secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::tests::ScriptedPrompter;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ask_rejects_wrong_length() {
        let id = "a".repeat(64);
        let secret = "b".repeat(64);
        let short_secret = "b".repeat(63);
        let p = ScriptedPrompter::new(&[
            "short",
            id.as_str(),
            short_secret.as_str(),
            secret.as_str(),
        ]);
        let c = ask_oauth_config(&p).unwrap();
        assert_eq!(c.client_id.as_str(), id);
        assert_eq!(c.secret.secret(), &secret);
        assert_eq!(p.asked().len(), 4);
    }
}
