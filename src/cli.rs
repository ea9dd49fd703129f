use anyhow::Result;
use console::style;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crate::args::{Args, Command};
use crate::backend::HttpBackend;
use crate::config::Config;
use crate::context::{BankAccountName, Company, WorkflowContext};
use crate::script::{HttpScriptSource, ScriptLoader};
use crate::session::{LinkingSession, RunOutcome, Services, WorkflowError};
use crate::terminal::{self, ConsoleNotifier, StdoutLineWriter};
use crate::widget::BrowserWidget;

pub async fn main(args: Args) -> Result<ExitCode> {
    let config = Config::from_args(&args.connection)?;
    log::debug!("Using {config:?}");
    let context = select_context(args.command)?;

    let session = LinkingSession::new(context, services(&config)?);
    let result = session.start().join().await;
    Ok(if finish(result) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn select_context(command: Command) -> Result<WorkflowContext> {
    Ok(match command {
        Command::LinkBanks { company } => WorkflowContext::linking(match company {
            Some(company) => Company(company),
            None => terminal::select_company()?,
        }),
        Command::SyncTransactions { account } => WorkflowContext::sync(match account {
            Some(account) => BankAccountName(account),
            None => terminal::select_bank_account()?,
        }),
    })
}

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

fn services(config: &Config) -> Result<Services> {
    let script_source = HttpScriptSource::with_timeout(SCRIPT_TIMEOUT)?;
    Ok(Services {
        backend: Arc::new(HttpBackend::new(config.backend.clone())),
        widget: Arc::new(BrowserWidget::new(config.listen_port)),
        scripts: Arc::new(ScriptLoader::new(Arc::new(script_source))),
        notifier: Arc::new(ConsoleNotifier),
        launcher_url: config.launcher_url.to_string(),
    })
}

/// Tell the user how the session went. Returns true if the command succeeded.
fn finish(result: Result<RunOutcome, WorkflowError>) -> bool {
    // Fatal errors were already shown by the notifier
    let Ok(outcome) = result else {
        return false;
    };
    match &outcome {
        RunOutcome::SyncEnqueued => {
            println!("Transaction sync started, the bank transactions will show up shortly.")
        }
        RunOutcome::AccountsAdded(batch) => {
            println!();
            println!("{}", style("Added accounts:").bold().underlined());
            terminal::print_accounts(&StdoutLineWriter, batch);
        }
        RunOutcome::Aborted => println!("Bank authentication aborted."),
        RunOutcome::WidgetError(message) => {
            println!("{}", style(format!("The bank flow failed: {message}")).red())
        }
        RunOutcome::FetchFailed | RunOutcome::SubmitFailed => {}
    }
    outcome.is_success() || outcome == RunOutcome::Aborted
}
