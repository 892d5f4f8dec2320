pub mod claims;
pub mod factory;
pub mod password;
pub mod roles;
pub mod token_codec;
pub mod token_issuer;

pub use claims::{Claims, TokenKind};
pub use factory::build_token_issuer;
pub use password::{hash_password, verify_password};
pub use roles::Role;
pub use token_codec::{Algorithm, CodecError, DecodeError, TokenCodec};
pub use token_issuer::{IssuedTokenPair, KindError, TokenIssuer, TokenTtls};
