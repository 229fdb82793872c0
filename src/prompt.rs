/// Interactive input used at the password, device-selection and code-entry steps.
///
/// Implementations block until the user answers.
pub trait Prompter {
    fn password(&self, label: &str) -> crate::Result<secrecy::SecretString>;

    fn text(&self, label: &str) -> crate::Result<String>;

    fn notice(&self, message: &str) {
        let product = env!("CARGO_PKG_NAME");
        eprintln!(":: {product} :: {message}");
    }

    /// Returns the 0-based index of the chosen option. Out-of-range or unparsable input asks
    /// again; there is no attempt limit.
    fn select(&self, label: &str, options: &[String]) -> crate::Result<usize> {
        if options.is_empty() {
            return Err(crate::Error::UserError(format!(
                "{label}: nothing to choose from"
            )));
        }
        for (i, option) in options.iter().enumerate() {
            self.notice(&format!("{:>3}. {option}", i + 1));
        }
        loop {
            let answer = self.text(&format!("{label} [1-{}]", options.len()))?;
            match answer.trim().parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
                _ => self.notice(&format!(
                    "Invalid selection '{}', enter a number between 1 and {}",
                    answer.trim(),
                    options.len()
                )),
            }
        }
    }
}

/// Prompts on the controlling terminal through dialoguer
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn password(&self, label: &str) -> crate::Result<secrecy::SecretString> {
        let s = dialoguer::Password::new()
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| crate::Error::UserError(format!("Unable to read password: {e}")))?;
        Ok(s.into())
    }

    fn text(&self, label: &str) -> crate::Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| crate::Error::UserError(format!("Unable to read input: {e}")))
    }
}
