//! Client orchestrator: wires stdin commands to the session controller.
//!
//! This module owns the event loop and drives:
//! - [`hox_client::SessionController`] for protocol and session state
//! - [`crate::printer::Printer`] for output

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use hox_client::{
    AuthState, ClientConfig, Credentials, Notification, PollResult, SessionController, SessionError,
};

use crate::commands::{self, HELP, UserCommand};
use crate::printer::Printer;

/// How long `quit` waits for the logout handshake.
const LOGOUT_GRACE: Duration = Duration::from_secs(3);

/// Run the console client until `quit` or end of input.
pub async fn start_client(
    config: ClientConfig,
    credentials: Credentials,
    json: bool,
    auto_login: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(server = %config.address(), pid = %credentials.pid, "starting");
    let mut ctrl = SessionController::new(config, credentials);
    ctrl.add_listener(Box::new(Printer::new(json)));

    if auto_login {
        ctrl.connect()?;
    }

    run_event_loop(&mut ctrl).await?;
    shutdown(&mut ctrl).await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

async fn run_event_loop(ctrl: &mut SessionController) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            poll = ctrl.recv() => {
                if let PollResult::Disconnected = poll {
                    eprintln!("transport stopped");
                    break;
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match commands::parse(&line) {
                    Ok(Some(UserCommand::Quit)) => break,
                    Ok(Some(UserCommand::Help)) => println!("{HELP}"),
                    Ok(Some(command)) => {
                        if let Err(e) = execute(ctrl, command) {
                            eprintln!("error: {e}");
                        }
                    }
                    Ok(None) => {}
                    Err(msg) => eprintln!("{msg}"),
                }
            }
        }
    }

    Ok(())
}

fn execute(ctrl: &mut SessionController, command: UserCommand) -> Result<(), SessionError> {
    match command {
        UserCommand::Login => ctrl.connect(),
        UserCommand::Logout => ctrl.logout(),
        UserCommand::List => ctrl.request_table_list(),
        UserCommand::New(itimes) => ctrl.open_new_table(itimes),
        UserCommand::Join(tid) => ctrl.select_table(&tid),
        UserCommand::Leave => ctrl.leave_table(),
        UserCommand::Role(color) => ctrl.change_role(color),
        UserCommand::Move(mv) => ctrl.send_move(mv),
        UserCommand::Draw => ctrl.offer_draw(),
        UserCommand::Resign => ctrl.resign(),
        UserCommand::Reset => ctrl.reset_table(),
        UserCommand::Say(text) => ctrl.send_table_message(&text),
        UserCommand::Tell { pid, text } => ctrl.send_private_message(&pid, &text),
        UserCommand::Invite(pid) => ctrl.invite(&pid),
        UserCommand::Info(pid) => ctrl.request_player_info(&pid),
        UserCommand::Help | UserCommand::Quit => Ok(()),
    }
}

/// Log out if needed and wait (bounded) for the transport to confirm.
async fn shutdown(ctrl: &mut SessionController) {
    if ctrl.state().auth == AuthState::LoggedOut {
        return;
    }
    if ctrl.logout().is_err() {
        return;
    }

    let wait = async {
        loop {
            match ctrl.recv().await {
                PollResult::Updated(notes) if notes.contains(&Notification::LoggedOut) => break,
                PollResult::Disconnected => break,
                _ => {}
            }
        }
    };
    if tokio::time::timeout(LOGOUT_GRACE, wait).await.is_err() {
        eprintln!("logout not confirmed, exiting anyway");
    }
}
