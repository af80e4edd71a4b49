use rw_core::{ClientError, Row};

/// A decoded reply sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sentence {
    /// One result row (`!re`).
    Re(Row),
    /// End of the reply (`!done`), possibly with attributes such as `=ret=`.
    Done(Row),
    /// Command error (`!trap`); the reply still ends with `!done`.
    Trap(Row),
    /// Session-ending error (`!fatal`).
    Fatal(String),
    /// The command matched nothing (`!empty`).
    Empty,
}

impl Sentence {
    pub fn parse(words: Vec<String>) -> Result<Self, ClientError> {
        let mut words = words.into_iter();
        let Some(reply) = words.next() else {
            return Err(ClientError::Protocol("empty sentence".to_string()));
        };

        match reply.as_str() {
            "!re" => Ok(Self::Re(parse_attributes(words))),
            "!done" => Ok(Self::Done(parse_attributes(words))),
            "!trap" => Ok(Self::Trap(parse_attributes(words))),
            "!empty" => Ok(Self::Empty),
            "!fatal" => Ok(Self::Fatal(words.collect::<Vec<_>>().join(" "))),
            other => Err(ClientError::Protocol(format!(
                "unknown reply word '{}'",
                other
            ))),
        }
    }
}

/// Collect `=key=value` words into a row. API tags (`.tag=`) and anything
/// else that is not an attribute word are ignored.
fn parse_attributes(words: impl Iterator<Item = String>) -> Row {
    let mut row = Row::new();
    for word in words {
        if let Some(attr) = word.strip_prefix('=') {
            match attr.split_once('=') {
                Some((key, value)) => row.insert(key, value),
                None => row.insert(attr, ""),
            }
        }
    }
    row
}

/// All sentences of one command reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub re: Vec<Row>,
    pub done: Row,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_parse_re_attributes() {
        let sentence = Sentence::parse(words(&[
            "!re",
            "=.id=*1",
            "=chain=forward",
            "=comment=a=b",
            "=disabled",
            ".tag=3",
        ]))
        .unwrap();

        let Sentence::Re(row) = sentence else {
            panic!("expected !re");
        };
        assert_eq!(row.get(".id"), "*1");
        assert_eq!(row.get("chain"), "forward");
        assert_eq!(row.get("comment"), "a=b");
        assert!(row.contains("disabled"));
        assert_eq!(row.get("disabled"), "");
        assert_eq!(row.len(), 4);
    }

    #[test]
    fn test_parse_control_replies() {
        assert_eq!(
            Sentence::parse(words(&["!done"])).unwrap(),
            Sentence::Done(Row::new())
        );
        assert_eq!(Sentence::parse(words(&["!empty"])).unwrap(), Sentence::Empty);
        assert_eq!(
            Sentence::parse(words(&["!fatal", "session", "terminated"])).unwrap(),
            Sentence::Fatal("session terminated".into())
        );

        let Sentence::Trap(row) =
            Sentence::parse(words(&["!trap", "=message=no such command"])).unwrap()
        else {
            panic!("expected !trap");
        };
        assert_eq!(row.get("message"), "no such command");
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(
            Sentence::parse(words(&["!bogus"])),
            Err(ClientError::Protocol(_))
        ));
        assert!(matches!(
            Sentence::parse(Vec::new()),
            Err(ClientError::Protocol(_))
        ));
    }
}
