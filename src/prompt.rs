//! Interactive collection of credentials and the target address.

use std::io::{self, BufRead, Write};
use zeroize::Zeroizing;

pub const USERNAME_PROMPT: &str = "Enter your username: ";
pub const PASSWORD_PROMPT: &str = "Password: ";
pub const ADDRESS_PROMPT: &str = "Switch IP: ";

/// What the operator typed at startup.
pub struct Credentials {
    pub username: String,
    pub password: Zeroizing<String>,
    pub address: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("address", &self.address)
            .finish()
    }
}

impl Credentials {
    /// Prompts on the controlling terminal: username, then the password
    /// without echo, then the switch address.
    pub fn prompt() -> Result<Self, crate::Error> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();

        let username = read_line(&mut input, &mut output, USERNAME_PROMPT, "Username")?;
        let password = Zeroizing::new(rpassword::prompt_password(PASSWORD_PROMPT).map_err(
            |source| crate::Error::Prompt {
                field: "password",
                source,
            },
        )?);
        let address = read_line(&mut input, &mut output, ADDRESS_PROMPT, "Switch address")?;

        Ok(Self {
            username,
            password,
            address,
        })
    }
}

/// Writes `prompt`, reads one line and trims it. Empty input and EOF are refused.
pub fn read_line<R, W>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    field: &'static str,
) -> Result<String, crate::Error>
where
    R: BufRead,
    W: Write,
{
    let to_prompt_error = |source| crate::Error::Prompt { field, source };

    output
        .write_all(prompt.as_bytes())
        .and_then(|()| output.flush())
        .map_err(to_prompt_error)?;

    let mut line = String::new();
    input.read_line(&mut line).map_err(to_prompt_error)?;

    let value = line.trim();
    if value.is_empty() {
        return Err(crate::Error::EmptyInput(field));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::io::Cursor;

    #[test]
    fn reads_and_trims_one_line() {
        let mut input = Cursor::new("  admin \r\n10.0.0.1\n");
        let mut output = Vec::new();

        let value = read_line(&mut input, &mut output, USERNAME_PROMPT, "Username").unwrap();
        assert_eq!(value, "admin");
        assert_eq!(output, USERNAME_PROMPT.as_bytes());

        let value = read_line(&mut input, &mut output, ADDRESS_PROMPT, "Switch address").unwrap();
        assert_eq!(value, "10.0.0.1");
    }

    #[test]
    fn blank_line_is_refused() {
        let mut input = Cursor::new("   \n");
        let err = read_line(&mut input, &mut Vec::new(), USERNAME_PROMPT, "Username").unwrap_err();
        assert!(matches!(err, crate::Error::EmptyInput("Username")));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn eof_is_refused() {
        let mut input = Cursor::new("");
        let err = read_line(&mut input, &mut Vec::new(), ADDRESS_PROMPT, "Switch address").unwrap_err();
        assert!(matches!(err, crate::Error::EmptyInput("Switch address")));
    }

    #[test]
    fn debug_hides_the_password() {
        let creds = Credentials {
            username: "admin".into(),
            password: Zeroizing::new("hunter2".into()),
            address: "10.0.0.1".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
