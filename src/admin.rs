//! Admin message body — login and user/role administration framing.
//!
//! ```text
//! Admin:    reserved (16B) | command (1B) | fields_count (1B) | fields...
//! AdminFld: length (4B) | field_type (1B) | payload (length-1 B)
//! ```
//!
//! Only `Login` is dispatched by the client; the remaining commands are
//! framed for completeness. Passwords are hashed with bcrypt under the
//! fixed salt the server derives credentials from.

use bcrypt::Version;

use crate::error::AspikeError;

/// Size of the admin prelude: 16 reserved bytes, command, field count.
pub const ADMIN_PRELUDE_SIZE: usize = 18;

/// The fixed bcrypt salt of the server's credential scheme.
pub const BCRYPT_SALT: &str = "$2a$10$7EqJtq98hPqEX7fNZaFWoO";

const BCRYPT_COST: u32 = 10;

/// The 16 salt bytes encoded in [`BCRYPT_SALT`]'s base64 suffix.
const BCRYPT_SALT_BYTES: [u8; 16] = [
    0xf4, 0x6b, 0x0b, 0xbe, 0xcf, 0xfe, 0x8d, 0x1b, 0x06, 0x67, 0xd8, 0x4f, 0x6d, 0xc1, 0xd8,
    0xa9,
];

// ── Enums ────────────────────────────────────────────────────────

/// Admin command bytes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    Authenticate = 0,
    CreateUser = 1,
    DropUser = 2,
    SetPassword = 3,
    ChangePassword = 4,
    GrantRoles = 5,
    RevokeRoles = 6,
    QueryUsers = 9,
    CreateRole = 10,
    DropRole = 11,
    GrantPrivileges = 12,
    RevokePrivileges = 13,
    SetWhitelist = 14,
    QueryRoles = 16,
    Login = 20,
}

impl TryFrom<u8> for AdminCommand {
    type Error = AspikeError;

    fn try_from(tag: u8) -> Result<Self, AspikeError> {
        Ok(match tag {
            0 => AdminCommand::Authenticate,
            1 => AdminCommand::CreateUser,
            2 => AdminCommand::DropUser,
            3 => AdminCommand::SetPassword,
            4 => AdminCommand::ChangePassword,
            5 => AdminCommand::GrantRoles,
            6 => AdminCommand::RevokeRoles,
            9 => AdminCommand::QueryUsers,
            10 => AdminCommand::CreateRole,
            11 => AdminCommand::DropRole,
            12 => AdminCommand::GrantPrivileges,
            13 => AdminCommand::RevokePrivileges,
            14 => AdminCommand::SetWhitelist,
            16 => AdminCommand::QueryRoles,
            20 => AdminCommand::Login,
            other => return Err(AspikeError::UnknownAdminCommand(other)),
        })
    }
}

/// Admin field types.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminFieldType {
    User = 0,
    Password = 1,
    OldPassword = 2,
    Credential = 3,
    ClearPassword = 4,
    SessionToken = 5,
    SessionTtl = 6,
    Roles = 10,
    Role = 11,
    Privileges = 12,
    Whitelist = 13,
}

impl TryFrom<u8> for AdminFieldType {
    type Error = AspikeError;

    fn try_from(tag: u8) -> Result<Self, AspikeError> {
        Ok(match tag {
            0 => AdminFieldType::User,
            1 => AdminFieldType::Password,
            2 => AdminFieldType::OldPassword,
            3 => AdminFieldType::Credential,
            4 => AdminFieldType::ClearPassword,
            5 => AdminFieldType::SessionToken,
            6 => AdminFieldType::SessionTtl,
            10 => AdminFieldType::Roles,
            11 => AdminFieldType::Role,
            12 => AdminFieldType::Privileges,
            13 => AdminFieldType::Whitelist,
            other => return Err(AspikeError::UnknownAdminFieldType(other)),
        })
    }
}

// ── Fields ───────────────────────────────────────────────────────

/// A typed admin field; same wire shape as a message field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminField {
    pub field_type: AdminFieldType,
    pub data: Vec<u8>,
}

impl AdminField {
    pub fn new(field_type: AdminFieldType, data: Vec<u8>) -> Self {
        Self { field_type, data }
    }

    pub fn pack_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.data.len() as u32 + 1).to_be_bytes());
        buf.push(self.field_type as u8);
        buf.extend_from_slice(&self.data);
    }

    /// Parse one admin field from the front of `data`, returning it
    /// together with the number of bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(AdminField, usize), AspikeError> {
        if data.len() < 5 {
            return Err(AspikeError::Truncated);
        }
        let length_raw: [u8; 4] = data[0..4].try_into().map_err(|_| AspikeError::Truncated)?;
        let length = u32::from_be_bytes(length_raw) as usize;
        if length < 1 {
            return Err(AspikeError::Truncated);
        }
        if data.len() < 4 + length {
            return Err(AspikeError::Truncated);
        }
        let field_type = AdminFieldType::try_from(data[4])?;
        let payload = data[5..4 + length].to_vec();
        Ok((AdminField::new(field_type, payload), 4 + length))
    }
}

// ── Message ──────────────────────────────────────────────────────

/// An admin message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminMessage {
    pub command: AdminCommand,
    pub fields: Vec<AdminField>,
}

impl AdminMessage {
    pub fn new(command: AdminCommand, fields: Vec<AdminField>) -> Self {
        Self { command, fields }
    }

    /// The login request: User as raw UTF-8, Password as the bcrypt
    /// credential string.
    pub fn login(user: &str, password: &str) -> Result<AdminMessage, AspikeError> {
        let credential = hash_password(password)?;
        Ok(Self::new(
            AdminCommand::Login,
            vec![
                AdminField::new(AdminFieldType::User, user.as_bytes().to_vec()),
                AdminField::new(AdminFieldType::Password, credential),
            ],
        ))
    }

    /// The session token carried in a login response, if present.
    pub fn session_token(&self) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|field| field.field_type == AdminFieldType::SessionToken)
            .map(|field| field.data.as_slice())
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ADMIN_PRELUDE_SIZE);
        buf.extend_from_slice(&[0u8; 16]);
        buf.push(self.command as u8);
        buf.push(self.fields.len() as u8);
        for field in &self.fields {
            field.pack_into(&mut buf);
        }
        buf
    }

    pub fn parse(data: &[u8]) -> Result<AdminMessage, AspikeError> {
        if data.len() < ADMIN_PRELUDE_SIZE {
            return Err(AspikeError::Truncated);
        }
        let command = AdminCommand::try_from(data[16])?;
        let fields_count = data[17];
        let mut data_left = &data[ADMIN_PRELUDE_SIZE..];
        let mut fields = Vec::with_capacity(fields_count as usize);
        for _ in 0..fields_count {
            let (field, consumed) = AdminField::parse(data_left)?;
            data_left = &data_left[consumed..];
            fields.push(field);
        }
        Ok(AdminMessage::new(command, fields))
    }
}

/// Hash a password into the server's credential form: bcrypt under the
/// fixed salt, rendered as a `$2a$` modular crypt string.
pub fn hash_password(password: &str) -> Result<Vec<u8>, AspikeError> {
    let parts = bcrypt::hash_with_salt(password.as_bytes(), BCRYPT_COST, BCRYPT_SALT_BYTES)
        .map_err(|err| AspikeError::Credential(err.to_string()))?;
    Ok(parts.format_for_version(Version::TwoA).into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_field_roundtrip() {
        let field = AdminField::new(AdminFieldType::User, b"admin".to_vec());
        let mut packed = Vec::new();
        field.pack_into(&mut packed);
        // Inclusive length prefix, as for message fields.
        assert_eq!(packed[..5], [0, 0, 0, 6, 0]);

        let (parsed, consumed) = AdminField::parse(&packed).unwrap();
        assert_eq!(parsed, field);
        assert_eq!(consumed, packed.len());
    }

    #[test]
    fn login_message_shape() {
        let message = AdminMessage::login("admin", "admin").unwrap();
        let packed = message.pack();

        assert_eq!(&packed[..16], &[0u8; 16]);
        assert_eq!(packed[16], AdminCommand::Login as u8);
        assert_eq!(packed[17], 2);

        let parsed = AdminMessage::parse(&packed).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.fields[0].field_type, AdminFieldType::User);
        assert_eq!(parsed.fields[0].data, b"admin");
        assert_eq!(parsed.fields[1].field_type, AdminFieldType::Password);
    }

    #[test]
    fn password_hash_is_deterministic_crypt_string() {
        let hash = hash_password("admin").unwrap();
        // Fixed salt: the prefix is the salt string itself, and the
        // total is a standard 60-byte crypt string.
        assert!(hash.starts_with(BCRYPT_SALT.as_bytes()));
        assert_eq!(hash.len(), 60);
        assert_eq!(hash, hash_password("admin").unwrap());
        assert_ne!(hash, hash_password("other").unwrap());
    }

    #[test]
    fn session_token_lookup() {
        let message = AdminMessage::new(
            AdminCommand::Login,
            vec![AdminField::new(
                AdminFieldType::SessionToken,
                b"tok".to_vec(),
            )],
        );
        assert_eq!(message.session_token(), Some(b"tok".as_slice()));
        assert!(
            AdminMessage::new(AdminCommand::Login, Vec::new())
                .session_token()
                .is_none()
        );
    }

    #[test]
    fn unknown_command_rejected() {
        let mut packed = AdminMessage::new(AdminCommand::QueryRoles, Vec::new()).pack();
        packed[16] = 99;
        assert!(matches!(
            AdminMessage::parse(&packed),
            Err(AspikeError::UnknownAdminCommand(99))
        ));
    }
}
