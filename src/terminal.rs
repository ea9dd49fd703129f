mod account_list;
mod console_notifier;
mod prompt;

pub use account_list::{print_accounts, LineWriter, StdoutLineWriter};
pub use console_notifier::ConsoleNotifier;
pub use prompt::{select_bank_account, select_company};
