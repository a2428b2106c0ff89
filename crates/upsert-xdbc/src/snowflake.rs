// Names of Database options --------------------------------------------

pub const DATABASE: &str = "adbc.snowflake.sql.db";
pub const SCHEMA: &str = "adbc.snowflake.sql.schema";
pub const WAREHOUSE: &str = "adbc.snowflake.sql.warehouse";
pub const ROLE: &str = "adbc.snowflake.sql.role";
pub const ACCOUNT: &str = "adbc.snowflake.sql.account";
pub const AUTH_TOKEN: &str = "adbc.snowflake.sql.client_option.auth_token";
pub const JWT_PRIVATE_KEY_PKCS8_VALUE: &str =
    "adbc.snowflake.sql.client_option.jwt_private_key_pkcs8_value";
pub const JWT_PRIVATE_KEY_PKCS8_PASSWORD: &str =
    "adbc.snowflake.sql.client_option.jwt_private_key_pkcs8_password";

/// Host suffix of Snowflake account URLs.
pub const HOST_SUFFIX: &str = ".snowflakecomputing.com";

/// Maps a JDBC connection property to the matching ADBC database option.
///
/// JDBC spells these `db`, `schema`, `warehouse`, `role`; anything else is
/// passed through unchanged.
pub fn option_for_jdbc_property(property: &str) -> &str {
    match property.to_ascii_lowercase().as_str() {
        "db" | "database" => DATABASE,
        "schema" => SCHEMA,
        "warehouse" => WAREHOUSE,
        "role" => ROLE,
        "account" => ACCOUNT,
        _ => property,
    }
}

/// True for option names whose values must never be logged.
pub fn is_sensitive_option(name: &str) -> bool {
    name == AUTH_TOKEN || name == JWT_PRIVATE_KEY_PKCS8_VALUE || name == JWT_PRIVATE_KEY_PKCS8_PASSWORD
}
