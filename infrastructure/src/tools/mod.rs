//! Tool implementations for the agent system
//!
//! Every built-in tool is a [`ToolHandler`](orc_domain::ToolHandler)
//! registered in a [`ToolRegistry`]:
//!
//! - `clock`: `get_today_date`, `get_time`
//! - `retrieval`: document search, multimodal search, example queries
//! - `dictionary`: datasource and table descriptions
//! - `query`: SQL validation, SQL and DAX execution

pub mod clock;
pub mod dictionary;
pub mod query;
pub mod retrieval;

mod registry;
mod schema;

pub use clock::{TimeTool, TodayDateTool};
pub use dictionary::{
    DataDictionary, DatasourcesInfoTool, DictionaryError, SchemaInfoTool, TablesInfoTool,
};
pub use query::{ExecuteQueryTool, ValidateSqlTool};
pub use registry::ToolRegistry;
pub use retrieval::{MultimodalRetrieveTool, QueriesRetrievalTool, VectorIndexRetrieveTool};
pub use schema::JsonSchemaToolConverter;

use std::sync::Arc;

use orc_application::{QueryEngine, SearchBackend};

use crate::config::FileSearchConfig;

/// Collaborators the built-in tools are wired to.
pub struct ToolBackends {
    pub search: Arc<dyn SearchBackend>,
    pub query: Arc<dyn QueryEngine>,
    pub dictionary: Arc<DataDictionary>,
}

/// Registry holding every built-in tool.
pub fn builtin_registry(backends: ToolBackends, search: &FileSearchConfig) -> ToolRegistry {
    let ToolBackends {
        search: backend,
        query,
        dictionary,
    } = backends;

    ToolRegistry::new()
        .register(TodayDateTool)
        .register(TimeTool)
        .register(VectorIndexRetrieveTool::new(backend.clone(), search.top_k))
        .register(MultimodalRetrieveTool::new(backend.clone(), search.top_k))
        .register(QueriesRetrievalTool::new(backend, search.queries_index.clone()))
        .register(DatasourcesInfoTool::new(dictionary.clone()))
        .register(TablesInfoTool::new(dictionary.clone()))
        .register(SchemaInfoTool::new(dictionary))
        .register(ValidateSqlTool)
        .register(ExecuteQueryTool::sql(query.clone()))
        .register(ExecuteQueryTool::dax(query))
}
