use super::{connect, follow_messages, render::print_view};
use dialoguer::Select;
use ether_lottery_core::{LotteryConfig, LotterySynchronizer};

const MENU: [&str; 5] = [
    "Participate",
    "Get results (manager only)",
    "Set new manager (only after a round)",
    "Refresh",
    "Quit",
];

/// Menu-driven session: one wallet connection, view re-rendered after
/// every action.
pub async fn interactive(sync: &LotterySynchronizer, config: &LotteryConfig) -> anyhow::Result<()> {
    connect(sync).await?;
    print_view(&sync.view(), config);

    // Reports account switches and countdown progress while the menu waits
    let printer = follow_messages(sync);
    let mut accounts = sync.store().subscribe();
    let account_watch = tokio::spawn(async move {
        let mut last = accounts.borrow_and_update().current_address;
        while accounts.changed().await.is_ok() {
            let current = accounts.borrow_and_update().current_address;
            if current != last {
                match current {
                    Some(address) => println!("Active account changed to {}", address),
                    None => println!("Wallet disconnected all accounts"),
                }
                last = current;
            }
        }
    });

    loop {
        println!();
        let choice = tokio::task::block_in_place(|| {
            Select::new()
                .with_prompt("What next?")
                .items(&MENU)
                .default(0)
                .interact()
        })?;

        // Failures are already recorded in the view state
        let _ = match choice {
            0 => sync.participate().await,
            1 => sync.get_results().await,
            2 => sync.set_new_manager().await,
            3 => sync.refresh(false).await,
            _ => break,
        };

        println!();
        print_view(&sync.view(), config);
    }

    printer.abort();
    account_watch.abort();
    Ok(())
}
