use console::style;

use crate::backend::AccountBatch;

pub trait LineWriter {
    fn write_line(&self, line: &str);
}

#[derive(Clone, Copy)]
pub struct StdoutLineWriter;

impl LineWriter for StdoutLineWriter {
    fn write_line(&self, line: &str) {
        println!("{}", line);
    }
}

/// Print the bank and its accounts as a bullet list
pub fn print_accounts(writer: &impl LineWriter, batch: &AccountBatch) {
    writer.write_line(&format!("• {}", style(&batch.bank_name).cyan().bold()));
    if batch.accounts.is_empty() {
        writer.write_line(&format!("  • {}", style("(none)").italic()));
        return;
    }
    for account in &batch.accounts {
        let name = account.display_name().unwrap_or("(unnamed account)");
        match account.id() {
            Some(id) if id != name => writer.write_line(&format!(
                "  • {} {}",
                style(name).magenta(),
                style(format!("[{id}]")).dim()
            )),
            _ => writer.write_line(&format!("  • {}", style(name).magenta())),
        }
    }
}
