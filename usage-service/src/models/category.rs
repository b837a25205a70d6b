//! Canonical billing categories and the product (SKU) lookup table.

use serde::{Deserialize, Serialize};

/// Canonical billing bucket.
///
/// Declaration order is the display order used by breakdown tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Compute")]
    Compute,
    #[serde(rename = "Network")]
    Network,
    #[serde(rename = "Router")]
    Router,
    #[serde(rename = "Block Storage")]
    BlockStorage,
    #[serde(rename = "Object Storage")]
    ObjectStorage,
    #[serde(rename = "Image")]
    Image,
    #[serde(rename = "Floating IP")]
    FloatingIp,
    #[serde(rename = "VPN")]
    Vpn,
    #[serde(rename = "Inbound International Traffic")]
    InboundInternationalTraffic,
    #[serde(rename = "Outbound International Traffic")]
    OutboundInternationalTraffic,
    #[serde(rename = "Inbound National Traffic")]
    InboundNationalTraffic,
    #[serde(rename = "Outbound National Traffic")]
    OutboundNationalTraffic,
    #[serde(rename = "Discounts")]
    Discounts,
}

/// Reported names that differ from the canonical name.
const ALIASES: &[(&str, Category)] = &[
    ("Virtual Machine", Category::Compute),
    ("Volume", Category::BlockStorage),
];

/// Known product identifiers. Backend product ids may carry a region prefix
/// (`NZ.o1.standard`), so lookups match on the dotted suffix.
pub const SKU_CATEGORIES: &[(&str, Category)] = &[
    ("m1.tiny", Category::Compute),
    ("m1.small", Category::Compute),
    ("m1.mini", Category::Compute),
    ("m1.medium", Category::Compute),
    ("m1.large", Category::Compute),
    ("m1.xlarge", Category::Compute),
    ("m1.2xlarge", Category::Compute),
    ("c1.small", Category::Compute),
    ("c1.large", Category::Compute),
    ("c1.xlarge", Category::Compute),
    ("c1.xxlarge", Category::Compute),
    ("c1.c1r1", Category::Compute),
    ("c1.c1r2", Category::Compute),
    ("c1.c1r4", Category::Compute),
    ("c1.c2r1", Category::Compute),
    ("c1.c2r2", Category::Compute),
    ("c1.c2r4", Category::Compute),
    ("c1.c2r8", Category::Compute),
    ("c1.c2r16", Category::Compute),
    ("c1.c4r2", Category::Compute),
    ("c1.c4r4", Category::Compute),
    ("c1.c4r8", Category::Compute),
    ("c1.c4r16", Category::Compute),
    ("c1.c4r32", Category::Compute),
    ("c1.c8r4", Category::Compute),
    ("c1.c8r8", Category::Compute),
    ("c1.c8r16", Category::Compute),
    ("c1.c8r32", Category::Compute),
    ("b1.standard", Category::BlockStorage),
    ("o1.standard", Category::ObjectStorage),
    ("n1.ipv4", Category::FloatingIp),
    ("n1.network", Category::Network),
    ("n1.router", Category::Router),
    ("n1.vpn", Category::Vpn),
    ("n1.international-in", Category::InboundInternationalTraffic),
    ("n1.international-out", Category::OutboundInternationalTraffic),
    ("n1.national-in", Category::InboundNationalTraffic),
    ("n1.national-out", Category::OutboundNationalTraffic),
];

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Compute,
        Category::Network,
        Category::Router,
        Category::BlockStorage,
        Category::ObjectStorage,
        Category::Image,
        Category::FloatingIp,
        Category::Vpn,
        Category::InboundInternationalTraffic,
        Category::OutboundInternationalTraffic,
        Category::InboundNationalTraffic,
        Category::OutboundNationalTraffic,
        Category::Discounts,
    ];

    /// Categories that receive a monthly free-tier allowance, in the order
    /// the allowance is applied.
    pub const FREE_TIER: [Category; 2] = [Category::Network, Category::Router];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Compute => "Compute",
            Category::Network => "Network",
            Category::Router => "Router",
            Category::BlockStorage => "Block Storage",
            Category::ObjectStorage => "Object Storage",
            Category::Image => "Image",
            Category::FloatingIp => "Floating IP",
            Category::Vpn => "VPN",
            Category::InboundInternationalTraffic => "Inbound International Traffic",
            Category::OutboundInternationalTraffic => "Outbound International Traffic",
            Category::InboundNationalTraffic => "Inbound National Traffic",
            Category::OutboundNationalTraffic => "Outbound National Traffic",
            Category::Discounts => "Discounts",
        }
    }

    /// Resolve a category name as reported by the rating backend.
    pub fn from_reported(name: &str) -> Option<Self> {
        let name = name.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
                    .map(|(_, c)| *c)
            })
    }

    /// Resolve a product identifier (`n1.router`, `NZ.o1.standard`) through
    /// the SKU table.
    pub fn from_product(product: &str) -> Option<Self> {
        sku_entry(product).map(|(_, c)| *c)
    }

    /// The product with any region prefix stripped: `NZ.o1.standard` and
    /// `o1.standard` both give `o1.standard`. Unknown products are returned
    /// unchanged.
    pub fn sku_of(product: &str) -> &str {
        sku_entry(product).map_or(product, |(sku, _)| *sku)
    }

    /// Metered once but reported by every region's view.
    pub fn is_globally_shared(&self) -> bool {
        matches!(self, Category::ObjectStorage)
    }

    pub fn free_tier_label(&self) -> String {
        format!("Free {} Discount", self.as_str())
    }
}

fn sku_entry(product: &str) -> Option<&'static (&'static str, Category)> {
    SKU_CATEGORIES.iter().find(|(sku, _)| {
        product == *sku
            || product
                .strip_suffix(sku)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
