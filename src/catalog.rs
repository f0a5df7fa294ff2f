//! Marketing descriptions for each customer segment

use serde::Serialize;

/// Display data for one cluster id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterDescriptor {
    pub id: usize,
    pub name: &'static str,
    pub description: &'static str,
    pub strategy: &'static str,
    pub color: &'static str,
}

const SEGMENTS: [ClusterDescriptor; 4] = [
    ClusterDescriptor {
        id: 0,
        name: "Budget Shoppers",
        description: "Low income, minimal spending, occasional buyers",
        strategy: "Discount campaigns, value products, loyalty rewards",
        color: "#f44336",
    },
    ClusterDescriptor {
        id: 1,
        name: "Regular Customers",
        description: "Moderate income, consistent purchases, balanced engagement",
        strategy: "Upsell opportunities, seasonal offers, email campaigns",
        color: "#2196F3",
    },
    ClusterDescriptor {
        id: 2,
        name: "Premium Buyers",
        description: "High income, premium spenders, strong purchasing power",
        strategy: "VIP treatment, exclusive products, personalized service",
        color: "#4CAF50",
    },
    ClusterDescriptor {
        id: 3,
        name: "Family Focused",
        description: "Value-conscious, larger households, practical buyers",
        strategy: "Family bundles, bulk discounts, kids products",
        color: "#FF9800",
    },
];

/// Read-only lookup from cluster id to its descriptor, ids dense from 0
#[derive(Debug, Clone)]
pub struct ClusterCatalog {
    entries: &'static [ClusterDescriptor],
}

impl Default for ClusterCatalog {
    fn default() -> Self {
        Self { entries: &SEGMENTS }
    }
}

impl ClusterCatalog {
    pub fn get(&self, id: usize) -> Option<&ClusterDescriptor> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusterDescriptor> {
        self.entries.iter()
    }
}
