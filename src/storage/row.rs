//! The fixed `(id, username, email)` row and its on-disk byte layout.
use crate::errors::Error;

/// Bytes reserved for `id` (stored as a little-endian `u32`).
pub const ID_SIZE: usize = std::mem::size_of::<u32>();
/// Bytes reserved for `username`, including the null terminator.
pub const USERNAME_SIZE: usize = 33;
/// Bytes reserved for `email`, including the null terminator.
pub const EMAIL_SIZE: usize = 256;
/// Largest username a caller may supply (`USERNAME_SIZE` minus the terminator).
pub const USERNAME_MAX_LEN: usize = USERNAME_SIZE - 1;
/// Largest email a caller may supply (`EMAIL_SIZE` minus the terminator).
pub const EMAIL_MAX_LEN: usize = EMAIL_SIZE - 1;
/// Serialized row width. Tests depend on this being exactly 293.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// A single table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    /// Builds a row from the three whitespace-separated tokens of an
    /// `insert` statement, enforcing the id-sign and string-length rules
    /// from spec §6.
    pub fn parse(id_tok: &str, username: &str, email: &str) -> Result<Row, Error> {
        let id: i64 = id_tok
            .parse()
            .map_err(|_| Error::Syntax(format!("invalid id '{id_tok}'")))?;
        if id < 0 {
            return Err(Error::IdNegative);
        }
        let id: u32 = id
            .try_into()
            .map_err(|_| Error::Syntax(format!("id '{id_tok}' out of range")))?;

        if username.len() > USERNAME_MAX_LEN || email.len() > EMAIL_MAX_LEN {
            return Err(Error::StringTooLong);
        }

        Ok(Row {
            id,
            username: username.to_string(),
            email: email.to_string(),
        })
    }

    /// Serializes the row to its fixed-width, null-terminated byte form.
    pub fn serialize(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        buf[0..ID_SIZE].copy_from_slice(&self.id.to_le_bytes());

        let uname = self.username.as_bytes();
        buf[ID_SIZE..ID_SIZE + uname.len()].copy_from_slice(uname);

        let email_off = ID_SIZE + USERNAME_SIZE;
        let email = self.email.as_bytes();
        buf[email_off..email_off + email.len()].copy_from_slice(email);

        buf
    }

    /// Reconstructs a row from its serialized form, stopping each string
    /// field at its null terminator.
    pub fn deserialize(buf: &[u8; ROW_SIZE]) -> Row {
        let id = u32::from_le_bytes(buf[0..ID_SIZE].try_into().unwrap());

        let uname_bytes = &buf[ID_SIZE..ID_SIZE + USERNAME_SIZE];
        let uname_end = uname_bytes.iter().position(|&b| b == 0).unwrap_or(uname_bytes.len());
        let username = String::from_utf8_lossy(&uname_bytes[..uname_end]).into_owned();

        let email_off = ID_SIZE + USERNAME_SIZE;
        let email_bytes = &buf[email_off..email_off + EMAIL_SIZE];
        let email_end = email_bytes.iter().position(|&b| b == 0).unwrap_or(email_bytes.len());
        let email = String::from_utf8_lossy(&email_bytes[..email_end]).into_owned();

        Row { id, username, email }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let row = Row::parse("7", "alice", "alice@example.com").unwrap();
        let bytes = row.serialize();
        assert_eq!(Row::deserialize(&bytes), row);
    }

    #[test]
    fn row_size_is_canonical() {
        assert_eq!(ROW_SIZE, 293);
    }

    #[test]
    fn rejects_negative_id() {
        assert!(matches!(
            Row::parse("-1", "cstack", "foo@bar.com"),
            Err(Error::IdNegative)
        ));
    }

    #[test]
    fn rejects_oversized_strings() {
        let long_username = "w".repeat(USERNAME_MAX_LEN + 1);
        assert!(matches!(
            Row::parse("1", &long_username, "a@b.com"),
            Err(Error::StringTooLong)
        ));
    }

    #[test]
    fn accepts_max_length_strings() {
        let username = "w".repeat(USERNAME_MAX_LEN);
        let email = "w".repeat(EMAIL_MAX_LEN);
        let row = Row::parse("1", &username, &email).unwrap();
        let bytes = row.serialize();
        assert_eq!(Row::deserialize(&bytes), row);
    }
}
