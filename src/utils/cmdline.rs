//! Conversion between the single argument string a command is built and
//! reviewed as, and the argv handed to the child process.

use std::path::Path;

/// Wrap a path in double quotes so it survives [`split_command_line`]
pub fn quote_path(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

/// Split an argument string on whitespace, honouring double quotes.
///
/// Quotes group words and are dropped; `\"` yields a literal quote. Other
/// backslashes are kept as-is so Windows paths pass through untouched.
/// No shell expansion of any kind happens.
pub fn split_command_line(command: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = command.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
                in_token = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        args.push(current);
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_words() {
        assert_eq!(
            split_command_line("-y -i in.mp4  -an\tout.mp4"),
            vec!["-y", "-i", "in.mp4", "-an", "out.mp4"]
        );
    }

    #[test]
    fn test_split_quoted_paths() {
        assert_eq!(
            split_command_line(r#"-y -i "C:\My Videos\a b.mp4" "out dir/aC0.mp4""#),
            vec!["-y", "-i", r"C:\My Videos\a b.mp4", "out dir/aC0.mp4"]
        );
    }

    #[test]
    fn test_split_empty_quotes_and_escapes() {
        assert_eq!(split_command_line(r#"-metadata title="""#), vec!["-metadata", "title="]);
        assert_eq!(split_command_line(r#"say \"hi\""#), vec!["say", "\"hi\""]);
        assert_eq!(split_command_line(r#""""#), vec![""]);
        assert!(split_command_line("   ").is_empty());
    }

    #[test]
    fn test_quote_path_round_trip() {
        let path = Path::new("/tmp/with space/clip.mp4");
        assert_eq!(split_command_line(&quote_path(path)), vec!["/tmp/with space/clip.mp4"]);
    }
}
