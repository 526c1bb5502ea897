use crate::config::{Messages, Settings};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::error::Error;
use std::io::{self, IsTerminal};

pub const CONFIRM_ACCEPT_MESSAGE: &str = "Proceeding";
pub const CONFIRM_REJECT_MESSAGE: &str = "Cowardly refused";

/// Ask a yes/no question, defaulting to no. `force` answers yes without asking.
pub fn confirm(settings: &Settings, prompt: &str) -> Result<bool, Box<dyn Error>> {
    if settings.force {
        return Ok(true);
    }

    if !io::stdin().is_terminal() {
        return Err(format!("{} (no terminal to confirm; pass --force)", prompt).into());
    }

    let accepted = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    let message = if accepted {
        accept_message(&settings.messages)
    } else {
        reject_message(&settings.messages)
    };
    println!("{}", message);
    Ok(accepted)
}

fn accept_message(messages: &Messages) -> &str {
    non_empty(messages.confirm_accept.as_deref()).unwrap_or(CONFIRM_ACCEPT_MESSAGE)
}

fn reject_message(messages: &Messages) -> &str {
    non_empty(messages.confirm_reject.as_deref()).unwrap_or(CONFIRM_REJECT_MESSAGE)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_skips_the_prompt() {
        let settings = Settings {
            force: true,
            ..Settings::default()
        };
        assert!(confirm(&settings, "Overwrite everything?").unwrap());
    }

    #[test]
    fn messages_fall_back_to_defaults() {
        let messages = Messages::default();
        assert_eq!(accept_message(&messages), CONFIRM_ACCEPT_MESSAGE);
        assert_eq!(reject_message(&messages), CONFIRM_REJECT_MESSAGE);

        let blank = Messages {
            confirm_accept: Some("  ".to_string()),
            confirm_reject: Some(String::new()),
        };
        assert_eq!(accept_message(&blank), CONFIRM_ACCEPT_MESSAGE);
        assert_eq!(reject_message(&blank), CONFIRM_REJECT_MESSAGE);
    }

    #[test]
    fn configured_messages_are_used() {
        let messages = Messages {
            confirm_accept: Some("Here we go".to_string()),
            confirm_reject: Some("Not today".to_string()),
        };
        assert_eq!(accept_message(&messages), "Here we go");
        assert_eq!(reject_message(&messages), "Not today");
    }
}
