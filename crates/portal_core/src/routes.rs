//! Static route table for the portal's pages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const ROOT: &str = "";

/// Logical pages of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Root,
    Account,
    Assets,
    Mint,
    Transactions,
    Apps,
    Settings,
    Search,
    RedEnvelope,
    Faucet,
    GasSwap,
}

impl Page {
    pub const ALL: [Page; 11] = [
        Page::Root,
        Page::Account,
        Page::Assets,
        Page::Mint,
        Page::Transactions,
        Page::Apps,
        Page::Settings,
        Page::Search,
        Page::RedEnvelope,
        Page::Faucet,
        Page::GasSwap,
    ];

    /// URL path relative to the dashboard root.
    pub fn path(&self) -> String {
        let suffix = match self {
            Page::Root => "",
            Page::Account => "/account",
            Page::Assets => "/assets",
            Page::Mint => "/mint",
            Page::Transactions => "/transactions",
            Page::Apps => "/apps",
            Page::Settings => "/settings",
            Page::Search => "/search",
            Page::RedEnvelope => "/red-envelope/detail",
            Page::Faucet => "/faucet",
            Page::GasSwap => "/gas-swap",
        };
        format!("{ROOT}{suffix}")
    }

    /// Logical name used in the route table.
    pub fn name(&self) -> &'static str {
        match self {
            Page::Root => "root",
            Page::Account => "account",
            Page::Assets => "assets",
            Page::Mint => "mint",
            Page::Transactions => "transactions",
            Page::Apps => "apps",
            Page::Settings => "settings",
            Page::Search => "search",
            Page::RedEnvelope => "red-envelope",
            Page::Faucet => "faucet",
            Page::GasSwap => "gas-swap",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown page: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_match_dashboard_table() {
        assert_eq!(Page::Root.path(), "");
        assert_eq!(Page::Account.path(), "/account");
        assert_eq!(Page::Assets.path(), "/assets");
        assert_eq!(Page::Mint.path(), "/mint");
        assert_eq!(Page::Transactions.path(), "/transactions");
        assert_eq!(Page::Apps.path(), "/apps");
        assert_eq!(Page::Settings.path(), "/settings");
        assert_eq!(Page::Search.path(), "/search");
        assert_eq!(Page::RedEnvelope.path(), "/red-envelope/detail");
        assert_eq!(Page::Faucet.path(), "/faucet");
        assert_eq!(Page::GasSwap.path(), "/gas-swap");
    }

    #[test]
    fn names_parse_back() {
        for page in Page::ALL {
            assert_eq!(page.name().parse::<Page>().unwrap(), page);
        }
        assert!("nowhere".parse::<Page>().is_err());
    }

    #[test]
    fn paths_are_unique() {
        let mut paths: Vec<String> = Page::ALL.iter().map(Page::path).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), Page::ALL.len());
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Page::GasSwap).unwrap();
        assert_eq!(json, "\"gas-swap\"");
    }
}
