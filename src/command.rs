use crate::app::{ClearTarget, Message};

pub const USAGE: &str = "\
Commands:
  search <query> [--limit N]   search for papers
  select <n>                   chat about result n
  ask <message>                ask about the selected paper
  bookmark <n>                 bookmark or unbookmark result n
  history | bookmarks          toggle a side panel
  repeat <n>                   rerun history entry n
  open <n>                     chat about bookmark n
  close                        close side panels (alias: esc)
  export                       save the conversation as JSON
  clear chat|history|bookmarks
  health                       check the backend
  help | quit";

#[derive(Debug)]
pub enum Command {
    App(Message),
    Help,
    Quit,
}

fn parse_index(arg: &str) -> Result<usize, String> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("expected a number starting at 1, got {:?}", arg.trim())),
    }
}

fn parse_search(rest: &str) -> Result<Message, String> {
    let mut limit = None;
    let mut words = Vec::new();
    let mut tokens = rest.split_whitespace();

    while let Some(token) = tokens.next() {
        if token == "--limit" || token == "-n" {
            let value = tokens.next().ok_or("--limit needs a value")?;
            limit = Some(
                value
                    .parse::<u32>()
                    .map_err(|_| format!("invalid limit {:?}", value))?,
            );
        } else {
            words.push(token);
        }
    }

    Ok(Message::Search {
        query: words.join(" "),
        limit,
    })
}

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let message = match name.to_ascii_lowercase().as_str() {
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        "search" | "s" => parse_search(rest)?,
        "select" => Message::SelectPaper(parse_index(rest)?),
        "ask" => Message::SendChat(rest.to_string()),
        "bookmark" => Message::ToggleBookmark(parse_index(rest)?),
        "history" => Message::ToggleHistory,
        "bookmarks" => Message::ToggleBookmarks,
        "repeat" => Message::RepeatSearch(parse_index(rest)?),
        "open" => Message::SelectBookmark(parse_index(rest)?),
        "close" | "esc" => Message::ClosePanels,
        "export" => Message::ExportConversation,
        "health" => Message::CheckHealth,
        "clear" => match rest {
            "chat" => Message::Clear(ClearTarget::Chat),
            "history" => Message::Clear(ClearTarget::History),
            "bookmarks" => Message::Clear(ClearTarget::Bookmarks),
            other => return Err(format!("clear what? {:?} (chat, history, bookmarks)", other)),
        },
        other => return Err(format!("unknown command {:?}, try `help`", other)),
    };

    Ok(Command::App(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_with_limit() {
        let Ok(Command::App(Message::Search { query, limit })) =
            parse("search graph neural --limit 5 networks")
        else {
            panic!("expected search");
        };
        assert_eq!(query, "graph neural networks");
        assert_eq!(limit, Some(5));
    }

    #[test]
    fn test_indices_are_one_based() {
        assert!(matches!(parse("select 1"), Ok(Command::App(Message::SelectPaper(0)))));
        assert!(matches!(parse("open 3"), Ok(Command::App(Message::SelectBookmark(2)))));
        assert!(parse("select 0").is_err());
        assert!(parse("bookmark x").is_err());
    }

    #[test]
    fn test_ask_keeps_text_verbatim() {
        let Ok(Command::App(Message::SendChat(text))) = parse("ask What  method did they use?") else {
            panic!("expected ask");
        };
        assert_eq!(text, "What  method did they use?");
    }

    #[test]
    fn test_clear_targets() {
        assert!(matches!(
            parse("clear bookmarks"),
            Ok(Command::App(Message::Clear(ClearTarget::Bookmarks)))
        ));
        assert!(parse("clear everything").is_err());
    }

    #[test]
    fn test_unknown_and_control_commands() {
        assert!(parse("frobnicate").is_err());
        assert!(matches!(parse("esc"), Ok(Command::App(Message::ClosePanels))));
        assert!(matches!(parse("quit"), Ok(Command::Quit)));
    }
}
