use std::str::FromStr;

/// finds a name in a list of strings and returns the following value if it exists.
///
/// E.g. for arguments ["--port", "123"] it returns "123"
pub fn named_option<R: FromStr>(args: &[String], name: &str) -> Result<Option<R>, R::Err> {
    let option_name = name.to_uppercase();
    args.iter()
        .position(|a| a.to_uppercase() == option_name)
        .and_then(|i| args.get(i + 1))
        .map(|a| a.parse::<R>())
        .transpose()
}

/// finds a name in a list of strings and returns all the values after it
pub fn named_option_list<'a>(args: &'a [String], name: &str) -> Option<&'a [String]> {
    let option_name = name.to_uppercase();
    args.iter()
        .position(|a| a.to_uppercase() == option_name)
        .map(|i| &args[i + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_named_value() {
        let args = vec!["--port".to_string(), "123".to_string()];
        assert_eq!(named_option::<u16>(&args, "--port").unwrap(), Some(123));
        assert_eq!(named_option::<u16>(&args, "--dir").unwrap(), None);
    }

    #[test]
    fn name_match_is_case_insensitive() {
        let args = vec!["--PORT".to_string(), "123".to_string()];
        assert_eq!(named_option::<u16>(&args, "--port").unwrap(), Some(123));
    }

    #[test]
    fn tail_after_name() {
        let args = ["--replicaof", "localhost", "6379"]
            .map(String::from)
            .to_vec();
        let tail = named_option_list(&args, "--replicaof").unwrap();
        assert_eq!(tail, &args[1..]);
    }
}
