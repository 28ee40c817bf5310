mod interactive;
mod render;

pub use interactive::interactive;

use anyhow::bail;
use dialoguer::Confirm;
use ether_lottery_core::{LotteryConfig, LotterySynchronizer};
use render::{print_messages, print_view, StatusReport};
use std::future::Future;
use tokio::task::JoinHandle;

/// Connect the wallet and load the lottery state.
async fn connect(sync: &LotterySynchronizer) -> anyhow::Result<()> {
    if !sync.connect().await? {
        bail!("Could not connect to the wallet, run with --verbose for details");
    }
    if let Some(notice) = sync.view().notice {
        println!("{}", notice);
    }
    Ok(())
}

/// Print success messages as they change, e.g. the draw countdown.
fn follow_messages(sync: &LotterySynchronizer) -> JoinHandle<()> {
    let mut rx = sync.store().subscribe();
    tokio::spawn(async move {
        let mut last = rx.borrow_and_update().success.clone();
        while rx.changed().await.is_ok() {
            let current = rx.borrow_and_update().success.clone();
            if current != last {
                if let Some(message) = &current {
                    println!("{}", message);
                }
                last = current;
            }
        }
    })
}

fn confirm(prompt: String, skip: bool) -> anyhow::Result<bool> {
    if skip {
        return Ok(true);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

/// Run one write action, streaming its messages, and turn a failure into
/// the message shown to the user.
async fn run_action<F, Fut>(sync: &LotterySynchronizer, action: F) -> anyhow::Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ether_lottery_core::Result<()>>,
{
    let printer = follow_messages(sync);
    let outcome = action().await;
    printer.abort();

    if let Err(e) = outcome {
        let message = sync.view().error.unwrap_or_else(|| e.to_string());
        bail!(message);
    }
    Ok(())
}

pub async fn show_status(
    sync: &LotterySynchronizer,
    config: &LotteryConfig,
    json: bool,
) -> anyhow::Result<()> {
    connect(sync).await?;
    let view = sync.view();

    if json {
        let report = StatusReport {
            contract: &config.contract_address,
            favicon: config.favicon_url(),
            view: &view,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_view(&view, config);
    }
    Ok(())
}

pub async fn participate(
    sync: &LotterySynchronizer,
    config: &LotteryConfig,
    yes: bool,
) -> anyhow::Result<()> {
    connect(sync).await?;

    let prompt = format!(
        "Participate in the lottery by sending exactly {} Ether?",
        config.entry_fee
    );
    if !confirm(prompt, yes)? {
        println!("Cancelled.");
        return Ok(());
    }

    run_action(sync, || sync.participate()).await?;
    println!("You are in! {} participants so far.", sync.view().participants.len());
    Ok(())
}

pub async fn get_results(
    sync: &LotterySynchronizer,
    config: &LotteryConfig,
    yes: bool,
) -> anyhow::Result<()> {
    connect(sync).await?;

    let prompt = format!(
        "Draw the winner now? The result is shown after {}s",
        config.draw_delay.as_secs()
    );
    if !confirm(prompt, yes)? {
        println!("Cancelled.");
        return Ok(());
    }

    run_action(sync, || sync.get_results()).await?;
    print_view(&sync.view(), config);
    Ok(())
}

pub async fn set_new_manager(
    sync: &LotterySynchronizer,
    config: &LotteryConfig,
    yes: bool,
) -> anyhow::Result<()> {
    connect(sync).await?;

    if !confirm("Set a new manager?".to_string(), yes)? {
        println!("Cancelled.");
        return Ok(());
    }

    run_action(sync, || sync.set_new_manager()).await?;
    let view = sync.view();
    if let Some(manager) = view.manager {
        println!("Current manager: {}", manager);
        println!("  {}", config.explorer_address_url(&manager));
    }
    print_messages(&view);
    Ok(())
}
