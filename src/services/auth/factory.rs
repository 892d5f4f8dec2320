/// Factory: build the token codec + issuer from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::{TokenCodec, TokenIssuer, TokenTtls};

pub fn build_token_issuer(config: &Config) -> Arc<TokenIssuer> {
    let codec = TokenCodec::new(config.jwt_secret.as_bytes(), config.jwt_algorithm)
        .with_leeway(config.token_leeway_seconds);

    let ttls = TokenTtls {
        access: config.access_token_ttl_seconds,
        refresh: config.refresh_token_ttl_seconds,
        reset: config.reset_token_ttl_seconds,
    };

    Arc::new(TokenIssuer::new(Arc::new(codec), ttls))
}
