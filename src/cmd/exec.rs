#[derive(clap::Args, Debug)]
pub struct ExecArgs {
    #[command(flatten)]
    pub credential: crate::cmd::CredentialArgs,

    /// Command to run; defaults to $SHELL
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<std::ffi::OsString>,
}

#[tokio::main(flavor = "current_thread")]
pub async fn run(global: &crate::cmd::GlobalArgs, args: &ExecArgs) -> Result<(), anyhow::Error> {
    let cred = crate::cmd::obtain_credentials(global, &args.credential).await?;
    execute(args, &cred).await
}

#[tracing::instrument(skip_all)]
async fn execute(
    args: &ExecArgs,
    cred: &crate::credentials::TemporaryCredential,
) -> Result<(), anyhow::Error> {
    let command = command_line(&args.command)?;
    let env = cred.env_vars(&args.credential.alias);
    let status = tokio::process::Command::new(&command[0])
        .args(&command[1..])
        .envs(env.iter().map(|(k, v)| (k, v.as_str())))
        .status()
        .await?;

    match status.code() {
        Some(0) => Ok(()),
        Some(code) => {
            let returning_code = std::process::ExitCode::from(code as u8);
            Err(crate::Error::SilentlyExitWithCode(returning_code).into())
        }
        None => handle_exit_status_signaled(status),
    }
}

fn command_line(command: &[std::ffi::OsString]) -> Result<Vec<std::ffi::OsString>, anyhow::Error> {
    if !command.is_empty() {
        return Ok(command.to_vec());
    }
    match std::env::var_os("SHELL") {
        Some(shell) if !shell.is_empty() => Ok(vec![shell]),
        _ => Err(crate::Error::UserError("command cannot be empty when $SHELL is unset".to_owned()).into()),
    }
}

#[cfg(unix)]
fn handle_exit_status_signaled(status: std::process::ExitStatus) -> Result<(), anyhow::Error> {
    use std::os::unix::process::ExitStatusExt;
    if let Some(sig) = status.signal() {
        let code = std::process::ExitCode::from(128 + (sig as u8));
        return Err(crate::Error::SilentlyExitWithCode(code).into());
    }
    Err(crate::Error::FailureButSilentlyExit.into())
}
