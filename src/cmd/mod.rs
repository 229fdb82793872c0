pub mod check;
pub mod credential_process;
pub mod exec;
pub mod flush;
pub mod list;
pub mod login;
pub mod oauth;
pub mod roles;

#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to config.yaml
    #[arg(long, global = true, env = "ONELOGIN_AWS_ROLE_CONFIG")]
    pub config: Option<std::path::PathBuf>,
}

impl GlobalArgs {
    pub async fn load_config(&self) -> crate::Result<crate::config::Config> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(crate::config::config_path);
        crate::config::Config::read_from_file(path).await
    }
}

/// Arguments of the commands that hand out AWS credentials
#[derive(clap::Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Role profile name (or role ARN) from config.yaml
    pub alias: String,

    /// AWS region to hand out with the credentials
    #[arg(long)]
    pub region: Option<String>,

    /// Credential lifetime in seconds
    #[arg(long)]
    pub duration: Option<i32>,

    /// Log in again even when stored credentials are still valid
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

impl From<&CredentialArgs> for crate::broker::CredentialOptions {
    fn from(args: &CredentialArgs) -> crate::broker::CredentialOptions {
        crate::broker::CredentialOptions {
            region: args.region.clone(),
            duration: args.duration,
            force: args.force,
        }
    }
}

/// Runs the broker for `args`, reporting failures on stderr.
pub(crate) async fn obtain_credentials(
    global: &GlobalArgs,
    args: &CredentialArgs,
) -> Result<crate::credentials::TemporaryCredential, anyhow::Error> {
    let config = global.load_config().await?;
    let store = crate::secret_store::KeyringSecretStore::default();
    let prompter = crate::prompt::TerminalPrompter;
    let broker = crate::broker::Broker::new(&config, &store, &prompter);

    match broker.credentials(&args.alias, &args.into()).await {
        Ok(c) => Ok(c),
        Err(crate::Error::AuthAborted) => {
            let product = env!("CARGO_PKG_NAME");
            eprintln!(":: {product} :: Login aborted");
            Err(crate::Error::FailureButSilentlyExit.into())
        }
        Err(e) => {
            tracing::debug!(err = ?e, args = ?args, "Failed to obtain AWS credentials");
            let product = env!("CARGO_PKG_NAME");
            let alias = &args.alias;
            eprintln!(":: {product} :: ERROR, Couldn't obtain AWS credentials for {alias} :::::::");
            eprintln!(":: {product} :: > {e}");
            Err(crate::Error::FailureButSilentlyExit.into())
        }
    }
}

/// Left-aligned columns sized to their widest cell
pub(crate) fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(c, w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_owned()
    };
    let mut out = line(headers.to_vec());
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_table() {
        let out = render_table(
            &["ID", "NAME"],
            &[
                vec!["111111111111".to_owned(), "production".to_owned()],
                vec!["2".to_owned(), "".to_owned()],
            ],
        );
        assert_eq!(
            out,
            "ID            NAME\n111111111111  production\n2\n"
        );
    }
}
