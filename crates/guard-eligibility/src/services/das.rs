//! Inventory through the Digital Asset Standard read API

use super::InventoryService;
use crate::types::{MetadataCollection, OwnedCoreAsset, OwnedToken};
use crate::{CheckerError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::{debug, warn};

const CORE_ASSET_INTERFACE: &str = "MplCoreAsset";
const CORE_COLLECTION_INTERFACE: &str = "MplCoreCollection";
const COLLECTION_GROUP_KEY: &str = "collection";

// ================================
// Wire Types
// ================================

#[derive(Debug, Serialize)]
struct DasRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'static str,
    params: GetAssetsByOwnerParams<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetAssetsByOwnerParams<'a> {
    owner_address: &'a str,
    page: u32,
    limit: u32,
    display_options: DisplayOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DisplayOptions {
    show_fungible: bool,
}

#[derive(Debug, Deserialize)]
struct DasResponse {
    result: Option<AssetPage>,
    error: Option<DasRpcError>,
}

#[derive(Debug, Deserialize)]
struct DasRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct AssetPage {
    #[serde(default)]
    items: Vec<DasAsset>,
}

#[derive(Debug, Clone, Deserialize)]
struct DasAsset {
    id: String,
    interface: String,
    #[serde(default)]
    grouping: Vec<DasGroup>,
    #[serde(default)]
    authorities: Vec<DasAuthority>,
    token_info: Option<DasTokenInfo>,
    compression: Option<DasCompression>,
}

#[derive(Debug, Clone, Deserialize)]
struct DasGroup {
    group_key: String,
    group_value: Option<String>,
    verified: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct DasAuthority {
    address: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DasTokenInfo {
    balance: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct DasCompression {
    compressed: bool,
}

impl DasAsset {
    fn is_core(&self) -> bool {
        self.interface == CORE_ASSET_INTERFACE
    }

    fn is_token(&self) -> bool {
        let compressed = self.compression.as_ref().is_some_and(|c| c.compressed);
        !compressed
            && self.interface != CORE_ASSET_INTERFACE
            && self.interface != CORE_COLLECTION_INTERFACE
    }

    fn collection(&self) -> Option<(Pubkey, bool)> {
        self.grouping
            .iter()
            .find(|g| g.group_key == COLLECTION_GROUP_KEY)
            .and_then(|g| {
                let key = parse_pubkey(g.group_value.as_deref()?)?;
                // DAS only lists unverified collections on request
                Some((key, g.verified.unwrap_or(true)))
            })
    }

    fn to_owned_token(&self) -> Option<OwnedToken> {
        let mint = parse_pubkey(&self.id)?;
        let amount = self
            .token_info
            .as_ref()
            .and_then(|info| info.balance)
            .unwrap_or(1);
        Some(OwnedToken {
            mint,
            amount,
            collection: self
                .collection()
                .map(|(key, verified)| MetadataCollection { key, verified }),
            mint_limit: None,
        })
    }

    fn to_owned_core_asset(&self) -> Option<OwnedCoreAsset> {
        let address = parse_pubkey(&self.id)?;
        let update_authority = match self.collection() {
            Some((collection, _)) => collection,
            None => self
                .authorities
                .first()
                .and_then(|a| parse_pubkey(&a.address))?,
        };
        Some(OwnedCoreAsset { address, update_authority, mint_limit: None })
    }
}

fn parse_pubkey(value: &str) -> Option<Pubkey> {
    match Pubkey::from_str(value) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!("Skipping asset with invalid address {}: {}", value, e);
            None
        }
    }
}

// ================================
// Client
// ================================

/// DAS `getAssetsByOwner` client
pub struct DasInventory {
    http: reqwest::Client,
    url: String,
    page_limit: u32,
}

impl DasInventory {
    pub fn new(url: impl Into<String>, page_limit: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            page_limit: page_limit.max(1),
        }
    }

    async fn fetch_page(&self, owner: &str, page: u32) -> Result<Vec<DasAsset>> {
        let request = DasRequest {
            jsonrpc: "2.0",
            id: "guard-eligibility",
            method: "getAssetsByOwner",
            params: GetAssetsByOwnerParams {
                owner_address: owner,
                page,
                limit: self.page_limit,
                display_options: DisplayOptions { show_fungible: true },
            },
        };

        let response: DasResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        page_items(response)
    }

    async fn fetch_all(&self, owner: &Pubkey) -> Result<Vec<DasAsset>> {
        let owner = owner.to_string();
        let mut assets = Vec::new();
        let mut page = 1;

        loop {
            let items = self.fetch_page(&owner, page).await?;
            let last_page = items.len() < self.page_limit as usize;
            assets.extend(items);
            if last_page {
                break;
            }
            page += 1;
        }

        debug!("Fetched {} assets for {} in {} page(s)", assets.len(), owner, page);
        Ok(assets)
    }
}

fn page_items(response: DasResponse) -> Result<Vec<DasAsset>> {
    if let Some(error) = response.error {
        return Err(CheckerError::Das { code: error.code, message: error.message });
    }
    Ok(response.result.map(|page| page.items).unwrap_or_default())
}

#[async_trait]
impl InventoryService for DasInventory {
    async fn fetch_owned_tokens(&self, owner: &Pubkey) -> Result<Vec<OwnedToken>> {
        let assets = self.fetch_all(owner).await?;
        Ok(assets
            .iter()
            .filter(|a| a.is_token())
            .filter_map(DasAsset::to_owned_token)
            .collect())
    }

    async fn fetch_owned_core_assets(&self, owner: &Pubkey) -> Result<Vec<OwnedCoreAsset>> {
        let assets = self.fetch_all(owner).await?;
        Ok(assets
            .iter()
            .filter(|a| a.is_core())
            .filter_map(DasAsset::to_owned_core_asset)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<DasAsset> {
        let response: DasResponse = serde_json::from_str(json).unwrap();
        page_items(response).unwrap()
    }

    #[test]
    fn test_parse_mixed_page() {
        let collection = Pubkey::new_unique();
        let nft = Pubkey::new_unique();
        let fungible = Pubkey::new_unique();
        let core = Pubkey::new_unique();
        let json = format!(
            r#"{{
                "jsonrpc": "2.0",
                "id": "guard-eligibility",
                "result": {{
                    "total": 3, "limit": 1000, "page": 1,
                    "items": [
                        {{ "id": "{nft}", "interface": "ProgrammableNFT",
                           "grouping": [{{ "group_key": "collection", "group_value": "{collection}" }}],
                           "token_info": {{ "balance": 1, "decimals": 0 }} }},
                        {{ "id": "{fungible}", "interface": "FungibleToken",
                           "token_info": {{ "balance": 2500, "decimals": 6 }} }},
                        {{ "id": "{core}", "interface": "MplCoreAsset",
                           "grouping": [{{ "group_key": "collection", "group_value": "{collection}" }}] }}
                    ]
                }}
            }}"#
        );
        let assets = parse(&json);

        let tokens: Vec<_> = assets
            .iter()
            .filter(|a| a.is_token())
            .filter_map(DasAsset::to_owned_token)
            .collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].mint, nft);
        assert_eq!(
            tokens[0].collection,
            Some(MetadataCollection { key: collection, verified: true })
        );
        assert_eq!(tokens[1].amount, 2500);
        assert!(tokens[1].collection.is_none());

        let cores: Vec<_> = assets
            .iter()
            .filter(|a| a.is_core())
            .filter_map(DasAsset::to_owned_core_asset)
            .collect();
        assert_eq!(cores.len(), 1);
        assert_eq!(cores[0].address, core);
        assert_eq!(cores[0].update_authority, collection);
    }

    #[test]
    fn test_core_asset_without_collection_uses_authority() {
        let authority = Pubkey::new_unique();
        let json = format!(
            r#"{{ "result": {{ "items": [
                {{ "id": "{}", "interface": "MplCoreAsset",
                   "authorities": [{{ "address": "{authority}", "scopes": ["full"] }}] }}
            ] }} }}"#,
            Pubkey::new_unique()
        );
        let assets = parse(&json);
        let core = assets[0].to_owned_core_asset().unwrap();
        assert_eq!(core.update_authority, authority);
    }

    #[test]
    fn test_compressed_assets_are_not_tokens() {
        let json = format!(
            r#"{{ "result": {{ "items": [
                {{ "id": "{}", "interface": "V1_NFT", "compression": {{ "compressed": true }} }}
            ] }} }}"#,
            Pubkey::new_unique()
        );
        assert!(!parse(&json)[0].is_token());
    }

    #[test]
    fn test_rpc_error_is_surfaced() {
        let response: DasResponse = serde_json::from_str(
            r#"{ "error": { "code": -32602, "message": "Invalid params" } }"#,
        )
        .unwrap();
        assert!(matches!(
            page_items(response),
            Err(CheckerError::Das { code: -32602, .. })
        ));
    }

    #[test]
    fn test_invalid_ids_are_skipped() {
        let json = r#"{ "result": { "items": [
            { "id": "not-a-key", "interface": "FungibleToken", "token_info": { "balance": 1 } }
        ] } }"#;
        assert!(parse(json)[0].to_owned_token().is_none());
    }
}
