/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Refetch all session data",
  },
  Command {
    name: "enroll",
    aliases: &["e", "join"],
    description: "Enroll in a plan: enroll <plan-id>",
  },
  Command {
    name: "clear",
    aliases: &["c", "invalidate"],
    description: "Drop all cached data",
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "End the session and exit",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit medicure",
  },
];

/// A command line split into the command word and its argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
  pub word: &'a str,
  pub arg: Option<&'a str>,
}

/// Split raw input like "enroll plan-3" into word and argument.
pub fn parse(input: &str) -> Invocation<'_> {
  let trimmed = input.trim();
  match trimmed.split_once(char::is_whitespace) {
    Some((word, arg)) => {
      let arg = arg.trim();
      Invocation {
        word,
        arg: (!arg.is_empty()).then_some(arg),
      }
    }
    None => Invocation {
      word: trimmed,
      arg: None,
    },
  }
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  // Only the command word is completed; arguments are free text
  let input_lower = parse(input).word.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("refresh");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "refresh");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("q");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "quit");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("enr");
    assert_eq!(suggestions[0].name, "enroll");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("gout");
    assert_eq!(suggestions[0].name, "logout");
  }

  #[test]
  fn test_suggestions_ignore_argument() {
    let suggestions = get_suggestions("enroll plan-3");
    assert_eq!(suggestions[0].name, "enroll");
  }

  #[test]
  fn test_parse_with_argument() {
    assert_eq!(
      parse("  enroll   plan-3 "),
      Invocation {
        word: "enroll",
        arg: Some("plan-3")
      }
    );
    assert_eq!(
      parse("refresh"),
      Invocation {
        word: "refresh",
        arg: None
      }
    );
  }
}
