//! Names of the built-in tools

pub const VECTOR_INDEX_RETRIEVE: &str = "vector_index_retrieve";
pub const MULTIMODAL_VECTOR_INDEX_RETRIEVE: &str = "multimodal_vector_index_retrieve";
pub const GET_TODAY_DATE: &str = "get_today_date";
pub const GET_TIME: &str = "get_time";
pub const GET_ALL_DATASOURCES_INFO: &str = "get_all_datasources_info";
pub const GET_ALL_TABLES_INFO: &str = "get_all_tables_info";
pub const GET_SCHEMA_INFO: &str = "get_schema_info";
pub const VALIDATE_SQL_QUERY: &str = "validate_sql_query";
pub const EXECUTE_SQL_QUERY: &str = "execute_sql_query";
pub const EXECUTE_DAX_QUERY: &str = "execute_dax_query";
pub const QUERIES_RETRIEVAL: &str = "queries_retrieval";
