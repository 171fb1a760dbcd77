//! Console command parsing.

use hox_core::moves::MoveInfo;
use hox_core::protocol::Color;
use hox_core::table::TimeSpec;

/// One line of user input, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Login,
    Logout,
    List,
    New(Option<TimeSpec>),
    Join(String),
    Leave,
    Role(Color),
    Move(MoveInfo),
    Draw,
    Resign,
    Reset,
    Say(String),
    Tell { pid: String, text: String },
    Invite(String),
    Info(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  login                 connect and log in
  logout                log out and disconnect
  list                  list open tables
  new [itimes]          open a table (default 900/180/20)
  join <tid>            watch a table
  leave                 leave the current table
  role <red|black|none> take or give up a seat
  move <cRcR>           play a move, e.g. move 1242
  draw | resign | reset
  say <text>            chat at the table
  tell <pid> <text>     private message
  invite <pid>          invite a player to this table
  info <pid>            show a player's record
  quit";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<UserCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "login" => UserCommand::Login,
        "logout" => UserCommand::Logout,
        "list" => UserCommand::List,
        "new" => {
            if rest.is_empty() {
                UserCommand::New(None)
            } else {
                let itimes = TimeSpec::parse(rest).map_err(|e| e.to_string())?;
                UserCommand::New(Some(itimes))
            }
        }
        "join" => UserCommand::Join(required(rest, "join <tid>")?),
        "leave" => UserCommand::Leave,
        "role" => UserCommand::Role(match rest.to_ascii_lowercase().as_str() {
            "red" => Color::Red,
            "black" => Color::Black,
            "none" | "observer" => Color::Observer,
            _ => return Err("usage: role <red|black|none>".to_string()),
        }),
        "move" => UserCommand::Move(MoveInfo::parse(rest).map_err(|e| e.to_string())?),
        "draw" => UserCommand::Draw,
        "resign" => UserCommand::Resign,
        "reset" => UserCommand::Reset,
        "say" => UserCommand::Say(required(rest, "say <text>")?),
        "tell" => {
            let (pid, text) = rest
                .split_once(char::is_whitespace)
                .map(|(pid, text)| (pid, text.trim()))
                .filter(|(_, text)| !text.is_empty())
                .ok_or_else(|| "usage: tell <pid> <text>".to_string())?;
            UserCommand::Tell {
                pid: pid.to_string(),
                text: text.to_string(),
            }
        }
        "invite" => UserCommand::Invite(required(rest, "invite <pid>")?),
        "info" => UserCommand::Info(required(rest, "info <pid>")?),
        "help" | "?" => UserCommand::Help,
        "quit" | "exit" => UserCommand::Quit,
        other => return Err(format!("unknown command `{other}` (try `help`)")),
    };
    Ok(Some(command))
}

fn required(arg: &str, usage: &str) -> Result<String, String> {
    if arg.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(arg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands() {
        assert_eq!(parse("  LIST ").unwrap(), Some(UserCommand::List));
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("join 12").unwrap(), Some(UserCommand::Join("12".into())));
        assert_eq!(parse("role none").unwrap(), Some(UserCommand::Role(Color::Observer)));
        assert!(parse("join").is_err());
        assert!(parse("role purple").is_err());
        assert!(parse("fly").is_err());
    }

    #[test]
    fn arguments_are_decoded() {
        assert_eq!(
            parse("new 600/60/20").unwrap(),
            Some(UserCommand::New(Some(TimeSpec {
                game: 600,
                moves: 60,
                free: 20
            })))
        );
        assert_eq!(parse("new").unwrap(), Some(UserCommand::New(None)));
        let Some(UserCommand::Move(mv)) = parse("move 1242").unwrap() else {
            panic!("expected a move");
        };
        assert_eq!(mv.to_wire(), "1242");
        assert!(parse("move 12").is_err());
    }

    #[test]
    fn chat_keeps_spaces() {
        assert_eq!(
            parse("tell ann good game, rematch?").unwrap(),
            Some(UserCommand::Tell {
                pid: "ann".into(),
                text: "good game, rematch?".into()
            })
        );
        assert!(parse("tell ann").is_err());
        assert_eq!(
            parse("say hello all").unwrap(),
            Some(UserCommand::Say("hello all".into()))
        );
    }
}
