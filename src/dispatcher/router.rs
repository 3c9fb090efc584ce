//! Capability name lookup.
//!
//! Routing is an exact, case-sensitive name match against a closed set. There
//! is no fallback: a name outside the set is reported as an unknown tool.

/// Every capability the dispatcher can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ListCards,
    ListDatabases,
    ExecuteCard,
    ExecuteQuery,
    CreateCard,
    GetCardDetails,
    UpdateCard,
    DeleteCard,
    UpdateCardVisualization,
    ListCollections,
    CreateCollection,
    ListTables,
    GetTableFields,
    ListDashboards,
    GetDashboardDetails,
    CreateDashboard,
    AddCardToDashboard,
}

impl Capability {
    pub const ALL: [Capability; 17] = [
        Self::ListCards,
        Self::ListDatabases,
        Self::ExecuteCard,
        Self::ExecuteQuery,
        Self::CreateCard,
        Self::GetCardDetails,
        Self::UpdateCard,
        Self::DeleteCard,
        Self::UpdateCardVisualization,
        Self::ListCollections,
        Self::CreateCollection,
        Self::ListTables,
        Self::GetTableFields,
        Self::ListDashboards,
        Self::GetDashboardDetails,
        Self::CreateDashboard,
        Self::AddCardToDashboard,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListCards => "list_cards",
            Self::ListDatabases => "list_databases",
            Self::ExecuteCard => "execute_card",
            Self::ExecuteQuery => "execute_query",
            Self::CreateCard => "create_card",
            Self::GetCardDetails => "get_card_details",
            Self::UpdateCard => "update_card",
            Self::DeleteCard => "delete_card",
            Self::UpdateCardVisualization => "update_card_visualization",
            Self::ListCollections => "list_collections",
            Self::CreateCollection => "create_collection",
            Self::ListTables => "list_tables",
            Self::GetTableFields => "get_table_fields",
            Self::ListDashboards => "list_dashboards",
            Self::GetDashboardDetails => "get_dashboard_details",
            Self::CreateDashboard => "create_dashboard",
            Self::AddCardToDashboard => "add_card_to_dashboard",
        }
    }
}
