#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// List role aliases instead of accounts
    #[arg(long, default_value_t = false)]
    pub roles: bool,
}

#[tokio::main(flavor = "current_thread")]
pub async fn run(global: &crate::cmd::GlobalArgs, args: &ListArgs) -> Result<(), anyhow::Error> {
    let config = global.load_config().await?;
    let out = if args.roles {
        roles_table(&config)
    } else {
        accounts_table(&config)
    };
    print!("{out}");
    Ok(())
}

fn accounts_table(config: &crate::config::Config) -> String {
    let rows: Vec<Vec<String>> = config
        .accounts
        .iter()
        .map(|(id, name)| vec![format!("{id:012}"), name.clone()])
        .collect();
    crate::cmd::render_table(&["ACCOUNT", "NAME"], &rows)
}

fn roles_table(config: &crate::config::Config) -> String {
    let rows: Vec<Vec<String>> = config
        .flat_roles()
        .into_iter()
        .map(|r| {
            vec![
                r.profile,
                r.account_name
                    .or(r.account_id.map(|a| format!("{a:012}")))
                    .unwrap_or_default(),
                format!("{} ({})", r.app_alias, r.app_id),
                r.arn,
                r.region.unwrap_or_default(),
            ]
        })
        .collect();
    crate::cmd::render_table(&["ALIAS", "ACCOUNT", "APP", "ROLE", "REGION"], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = indoc::indoc! {"
        username: alice@example.com
        subdomain: example
        accounts:
          111111111111: production
        apps:
          123456:
            name: AWS Production
            alias: prod
            roles:
              - arn: arn:aws:iam::111111111111:role/Admin
                profile: prod-admin
                region: eu-west-1
              - arn: arn:aws:iam::022222222222:role/ReadOnly
                profile: other-ro
    "};

    #[test]
    fn test_accounts_table() {
        let c = crate::config::Config::from_yaml_slice(CONFIG.as_bytes()).unwrap();
        assert_eq!(
            accounts_table(&c),
            "ACCOUNT       NAME\n111111111111  production\n"
        );
    }

    #[test]
    fn test_roles_table() {
        let c = crate::config::Config::from_yaml_slice(CONFIG.as_bytes()).unwrap();
        let out = roles_table(&c);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("prod-admin  production"));
        assert!(lines[2].contains("022222222222"));
        assert!(lines[1].ends_with("eu-west-1"));
    }
}
