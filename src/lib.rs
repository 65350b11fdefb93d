pub mod audit;

mod database;
pub use database::batch_upsert::{
    field, field_in_column, field_with_default, ignored_field, primary_key, value_is_blank, Field,
    UpsertRecord,
};
pub use database::mysql::{
    batch_upsert::{
        batch_upsert, build_column_lists, build_upsert_statement, format_table_name, plan_batches,
        quote_identifier, BatchPlan, BatchUpsertError, BulkUpsertStats, PlanError, Statement,
        MAX_PLACEHOLDERS_PER_STATEMENT,
    },
    client::{
        connection_string, MysqlClient, MysqlConnectionError, MysqlError, UpsertExecutor,
    },
};

mod logger;
pub use logger::{setup_info_logger, setup_logger};

// export 3rd party dependencies
pub use async_trait::async_trait;
pub use mysql_async::Value;
