use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input};

use crate::context::{BankAccountName, Company};

pub fn select_company() -> Result<Company> {
    Ok(Company(prompt("Select a company")?))
}

pub fn select_bank_account() -> Result<BankAccountName> {
    Ok(BankAccountName(prompt("Select a Bank Account")?))
}

fn prompt(prompt: &str) -> Result<String> {
    let answer: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .validate_with(|input: &String| {
            if input.trim().is_empty() {
                Err("This is required")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(answer.trim().to_string())
}
