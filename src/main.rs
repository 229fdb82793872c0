#[derive(clap::Parser)]
#[clap(author, version, long_about = None)]
#[clap(about = "AWS credentials through OneLogin SAML")]
#[clap(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: onelogin_aws_role::cmd::GlobalArgs,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Obtain and store credentials for a role
    Login(onelogin_aws_role::cmd::login::LoginArgs),
    /// Run a command with credentials for a role in its environment
    Exec(onelogin_aws_role::cmd::exec::ExecArgs),
    /// credential_process helper for ~/.aws/config
    CredentialProcess(onelogin_aws_role::cmd::credential_process::CredentialProcessArgs),
    /// Invalidate stored credentials for a role
    Flush(onelogin_aws_role::cmd::flush::FlushArgs),
    /// Manage OneLogin API client credentials
    Oauth(onelogin_aws_role::cmd::oauth::OAuthArgs),
    /// Report whether the cached OneLogin access token is valid
    Check,
    /// List configured accounts or roles
    List(onelogin_aws_role::cmd::list::ListArgs),
    /// List roles granted by the cached SAML assertion
    Roles(onelogin_aws_role::cmd::roles::RolesArgs),
}

fn main() -> Result<std::process::ExitCode, anyhow::Error> {
    use clap::Parser;
    let cli = Cli::parse();

    enable_tracing();
    let g = &cli.global;
    let retval = match &cli.command {
        Commands::Login(args) => onelogin_aws_role::cmd::login::run(g, args),
        Commands::Exec(args) => onelogin_aws_role::cmd::exec::run(g, args),
        Commands::CredentialProcess(args) => {
            onelogin_aws_role::cmd::credential_process::run(g, args)
        }
        Commands::Flush(args) => onelogin_aws_role::cmd::flush::run(args),
        Commands::Oauth(args) => onelogin_aws_role::cmd::oauth::run(args),
        Commands::Check => onelogin_aws_role::cmd::check::run(),
        Commands::List(args) => onelogin_aws_role::cmd::list::run(g, args),
        Commands::Roles(args) => onelogin_aws_role::cmd::roles::run(g, args),
    };
    match retval {
        Ok(_) => Ok(std::process::ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<onelogin_aws_role::Error>() {
            Some(onelogin_aws_role::Error::FailureButSilentlyExit) => {
                Ok(std::process::ExitCode::FAILURE)
            }
            Some(onelogin_aws_role::Error::SilentlyExitWithCode(c)) => Ok(*c),
            _ => Err(e),
        },
    }
}

fn enable_tracing() {
    let filter = match std::env::var("ONELOGIN_AWS_ROLE_LOG") {
        Ok(l) => tracing_subscriber::EnvFilter::new(l),
        Err(_) => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("onelogin_aws_role=info")),
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
