pub mod oauth;
pub mod token;

pub use oauth::OAuthClient;
pub use token::TokenSet;
