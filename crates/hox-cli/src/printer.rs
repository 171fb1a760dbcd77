//! Renders session notifications on stdout.

use hox_client::{LifecycleCode, MessageKind, Notification, SessionListener};

/// Prints each notification as a line of text, or as one JSON object per
/// line in `--json` mode.
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl SessionListener for Printer {
    fn notify(&mut self, notification: &Notification) {
        if self.json {
            match serde_json::to_string(notification) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("failed to encode notification: {e}"),
            }
        } else if let Some(text) = describe(notification) {
            println!("{text}");
        }
    }
}

/// Human-readable form of a notification. `None` for ones not worth a line.
pub fn describe(notification: &Notification) -> Option<String> {
    let text = match notification {
        Notification::Connection(LifecycleCode::Connected) => "* connected, logging in".to_string(),
        Notification::Connection(_) => "* disconnected".to_string(),
        Notification::LoginResult { ok: true, .. } => "* logged in".to_string(),
        Notification::LoginResult {
            ok: false,
            error: Some(code),
        } => format!("* login failed: {code}"),
        Notification::LoginResult { ok: false, .. } => "* login failed".to_string(),
        Notification::LoggedOut => "* logged out".to_string(),
        Notification::TableEntered(table) => {
            let mut text = format!("* table {table}");
            if !table.observers.is_empty() {
                text.push_str(&format!(" | watching: {}", table.observers.join(", ")));
            }
            text
        }
        Notification::TableClosed => "* left table".to_string(),
        Notification::LocalRoleChanged(color) => format!("* you are now {color}"),
        Notification::PlayerJoined { pid, rating, color } => {
            format!("* {pid}({rating}) joined as {color}")
        }
        Notification::PlayerLeft { pid } => format!("* {pid} left"),
        Notification::MoveReceived(mv) => format!("move {} {mv}", mv.to_wire()),
        Notification::MovesRestored(moves) => {
            let list: Vec<String> = moves.iter().map(|m| m.to_wire()).collect();
            format!("* {} moves played: {}", moves.len(), list.join(" "))
        }
        Notification::GameEnded(status) => format!("* game over: {status}"),
        Notification::GameReset => "* board reset".to_string(),
        Notification::DrawOffered { pid } => format!("* {pid} offers a draw"),
        Notification::Message(msg) => match msg.kind {
            MessageKind::TableChat => format!("[{}] {}: {}", msg.table_id, msg.sender, msg.content),
            MessageKind::PrivateChat => format!("<{}> {}", msg.sender, msg.content),
            MessageKind::Invite => format!("* {}", msg.content),
        },
        Notification::TablesListed(tables) => {
            let mut text = format!("* {} tables", tables.len());
            for table in tables {
                text.push_str(&format!("\n  {table}"));
            }
            text
        }
        Notification::PlayersListed(players) => {
            let names: Vec<String> = players.iter().map(|p| p.to_string()).collect();
            format!("* online: {}", names.join(", "))
        }
        Notification::PlayerLoggedIn(_) | Notification::PlayerLoggedOut { .. } => return None,
        Notification::PlayerRecord(record) => format!(
            "* {}({}) W{} D{} L{}",
            record.pid, record.rating, record.wins, record.draws, record.losses
        ),
        Notification::ScoreUpdated { pid, rating } => format!("* {pid} is now rated {rating}"),
        Notification::RequestFailed { op, code } => format!("* {op} failed: {code}"),
        Notification::NetworkFault(code) => format!("* network error ({code:?})"),
    };
    Some(text)
}
