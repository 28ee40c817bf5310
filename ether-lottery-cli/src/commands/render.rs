use comfy_table::{presets::UTF8_FULL, Table};
use ether_lottery_core::{LotteryConfig, ViewState};
use serde::Serialize;

/// JSON form of `status --json`
#[derive(Serialize)]
pub struct StatusReport<'a> {
    pub contract: &'a str,
    pub favicon: Option<String>,
    #[serde(flatten)]
    pub view: &'a ViewState,
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

pub fn print_view(view: &ViewState, config: &LotteryConfig) {
    println!("Ether Lottery");
    println!("═══════════════════════════════════");
    println!(
        "Your address:    {}",
        or_dash(view.current_address.map(|a| a.to_string()))
    );
    println!(
        "Current manager: {}",
        or_dash(view.manager.map(|a| a.to_string()))
    );
    println!("Pot:             {} Ether", view.pot);
    if let Some(at) = view.last_refreshed {
        println!("Updated:         {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();

    println!("Participants ({})", view.participants.len());
    if !view.participants.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["#", "Address", "Explorer"]);
        for (index, participant) in view.participants.iter().enumerate() {
            table.add_row(vec![
                (index + 1).to_string(),
                participant.to_string(),
                config.explorer_address_url(participant),
            ]);
        }
        println!("{}", table);
    }
    println!();

    println!("Lottery History");
    if view.history.is_empty() {
        println!("No winners yet.");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Lottery", "Winner", "Explorer"]);
        for entry in &view.history {
            table.add_row(vec![
                format!("#{}", entry.round_id),
                entry.winner.to_string(),
                config.explorer_address_url(&entry.winner),
            ]);
        }
        println!("{}", table);
    }

    print_messages(view);
}

pub fn print_messages(view: &ViewState) {
    if let Some(error) = &view.error {
        println!();
        println!("Error: {}", error);
    }
    if let Some(success) = &view.success {
        println!();
        println!("{}", success);
    }
}
