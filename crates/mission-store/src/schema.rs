//! Resource store database schema.

/// SQL to create the resources table.
pub const CREATE_RESOURCES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS community_resources (
    scope      TEXT NOT NULL,
    key        TEXT NOT NULL,
    body       BYTEA NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (scope, key)
);
";
