//! Stable item id to remote slot bookkeeping.
//!
//! The remote cart is a plain array that renumbers on every removal, so the
//! stored mapping is a cache: it is rebuilt from the freshly decoded cart
//! after every mutating call and must be looked up again right before the
//! next one.

use std::sync::Arc;
use tacos_core::Result;
use tacos_core::item::ParsedLineItem;
use tacos_core::mapping::{IndexMapping, IndexMappingRepository};
use tacos_core::recipe_id::line_item_identity;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct IndexMappingStore {
    repository: Arc<dyn IndexMappingRepository>,
}

impl IndexMappingStore {
    pub fn new(repository: Arc<dyn IndexMappingRepository>) -> Self {
        Self { repository }
    }

    pub async fn store(
        &self,
        session_id: &str,
        remote_index: usize,
        stable_item_id: &str,
        recipe_hash: Option<String>,
    ) -> Result<()> {
        self.repository
            .store(&IndexMapping {
                session_id: session_id.to_string(),
                stable_item_id: stable_item_id.to_string(),
                remote_index,
                recipe_hash,
            })
            .await
    }

    /// Current remote slot of `stable_item_id`, `None` when unknown.
    pub async fn lookup_remote_index(
        &self,
        session_id: &str,
        stable_item_id: &str,
    ) -> Result<Option<usize>> {
        Ok(self
            .repository
            .find(session_id, stable_item_id)
            .await?
            .map(|mapping| mapping.remote_index))
    }

    /// Mappings of a session ordered by remote slot.
    pub async fn list(&self, session_id: &str) -> Result<Vec<IndexMapping>> {
        let mut mappings = self.repository.list(session_id).await?;
        mappings.sort_by_key(|mapping| mapping.remote_index);
        Ok(mappings)
    }

    pub async fn remove_all(&self, session_id: &str) -> Result<()> {
        self.repository.remove_all(session_id).await
    }

    /// Rebuilds the mapping of a session from the decoded cart.
    ///
    /// `expected` lists the items the cart should contain, in remote order;
    /// `appended` names the one just added, if any. See [`match_items`] for
    /// the pairing rules. The result replaces everything stored for the
    /// session.
    pub async fn reconcile(
        &self,
        session_id: &str,
        expected: &[IndexMapping],
        decoded: &[ParsedLineItem],
        appended: Option<&str>,
    ) -> Result<Vec<IndexMapping>> {
        let rebuilt = match_items(session_id, expected, decoded, appended);
        self.repository.replace_all(session_id, &rebuilt).await?;
        debug!(
            session_id,
            expected = expected.len(),
            decoded = decoded.len(),
            mapped = rebuilt.len(),
            "Reconciled index mappings"
        );
        Ok(rebuilt)
    }
}

/// Remote slot of the `position`-th decoded item.
pub fn slot_of(item: &ParsedLineItem, position: usize) -> usize {
    item.slot.unwrap_or(position)
}

/// Pairs expected items with decoded cart items.
///
/// Items whose recorded recipe hash equals a decoded item's hash are paired
/// first, in order. An `appended` item left unpaired takes the last free
/// decoded item, since the remote appends to the end of the cart. The
/// remaining expected items are paired positionally with the remaining
/// decoded items, which the remote keeps in insertion order, never crossing
/// a neighbour that is already placed. Expected items left over have
/// vanished remotely and are dropped.
pub fn match_items(
    session_id: &str,
    expected: &[IndexMapping],
    decoded: &[ParsedLineItem],
    appended: Option<&str>,
) -> Vec<IndexMapping> {
    let decoded_hashes: Vec<Option<String>> = decoded.iter().map(line_item_identity).collect();
    let mut taken = vec![false; decoded.len()];
    let mut assigned: Vec<Option<usize>> = vec![None; expected.len()];

    for (e, mapping) in expected.iter().enumerate() {
        let Some(hash) = &mapping.recipe_hash else {
            continue;
        };
        let hit = decoded_hashes
            .iter()
            .enumerate()
            .find(|(d, candidate)| !taken[*d] && candidate.as_deref() == Some(hash.as_str()));
        if let Some((d, _)) = hit {
            taken[d] = true;
            assigned[e] = Some(d);
        }
    }

    if let Some(appended) = appended
        && let Some(e) = expected.iter().position(|m| m.stable_item_id == appended)
        && assigned[e].is_none()
        && let Some(d) = (0..decoded.len()).rev().find(|d| !taken[*d])
    {
        taken[d] = true;
        assigned[e] = Some(d);
    }

    for (e, mapping) in expected.iter().enumerate() {
        if assigned[e].is_some() {
            continue;
        }
        let lower = assigned[..e].iter().flatten().max().copied();
        let upper = assigned[e + 1..].iter().flatten().min().copied();
        let candidate = (0..decoded.len()).find(|d| {
            !taken[*d] && lower.is_none_or(|l| *d > l) && upper.is_none_or(|u| *d < u)
        });
        match candidate {
            Some(d) => {
                if mapping.recipe_hash.is_some() && decoded_hashes[d].is_some() {
                    debug!(
                        session_id,
                        stable_item_id = %mapping.stable_item_id,
                        "Recipe hash differs from decoded item, pairing by position"
                    );
                }
                taken[d] = true;
                assigned[e] = Some(d);
            }
            None => warn!(
                session_id,
                stable_item_id = %mapping.stable_item_id,
                "Item no longer present in remote cart"
            ),
        }
    }

    let mut rebuilt: Vec<IndexMapping> = expected
        .iter()
        .zip(assigned)
        .filter_map(|(mapping, d)| {
            let d = d?;
            Some(IndexMapping {
                session_id: session_id.to_string(),
                stable_item_id: mapping.stable_item_id.clone(),
                remote_index: slot_of(&decoded[d], d),
                recipe_hash: mapping
                    .recipe_hash
                    .clone()
                    .or_else(|| decoded_hashes[d].clone()),
            })
        })
        .collect();
    rebuilt.sort_by_key(|mapping| mapping.remote_index);
    rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;
    use tacos_core::item::{ParsedIngredient, TacoSize};
    use tacos_infrastructure::TomlIndexMappingRepository;
    use tempfile::TempDir;

    fn line(slot: usize, size: TacoSize, meat: &str) -> ParsedLineItem {
        ParsedLineItem {
            slot: Some(slot),
            size: Some(size),
            meats: vec![ParsedIngredient {
                code: meat.to_string(),
                name: meat.to_string(),
                quantity: 1,
            }],
            sauces: Vec::new(),
            garnitures: Vec::new(),
            note: None,
            quantity: 1,
            price: 10.0,
        }
    }

    fn expected(stable_id: &str, remote_index: usize, hash: Option<String>) -> IndexMapping {
        IndexMapping {
            session_id: "s1".into(),
            stable_item_id: stable_id.into(),
            remote_index,
            recipe_hash: hash,
        }
    }

    #[test]
    fn test_hash_match_survives_reordering() {
        let a = line(0, TacoSize::L, "poulet");
        let b = line(1, TacoSize::Xl, "kebab");
        let hash_a = line_item_identity(&a);
        let hash_b = line_item_identity(&b);

        // Decoded order is the reverse of the expected order.
        let decoded = vec![line(0, TacoSize::Xl, "kebab"), line(1, TacoSize::L, "poulet")];
        let rebuilt = match_items(
            "s1",
            &[expected("A", 0, hash_a), expected("B", 1, hash_b)],
            &decoded,
            None,
        );

        assert_eq!(rebuilt[0].stable_item_id, "B");
        assert_eq!(rebuilt[0].remote_index, 0);
        assert_eq!(rebuilt[1].stable_item_id, "A");
        assert_eq!(rebuilt[1].remote_index, 1);
    }

    #[test]
    fn test_positional_fallback_when_hashes_differ() {
        let decoded = vec![line(0, TacoSize::L, "poulet_slug"), line(1, TacoSize::Xl, "kebab_slug")];
        let rebuilt = match_items(
            "s1",
            &[
                expected("A", 0, Some("deadbeef".into())),
                expected("B", 1, None),
            ],
            &decoded,
            None,
        );

        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt[0].stable_item_id, "A");
        assert_eq!(rebuilt[0].recipe_hash.as_deref(), Some("deadbeef"));
        assert_eq!(rebuilt[1].stable_item_id, "B");
        assert_eq!(rebuilt[1].recipe_hash, line_item_identity(&decoded[1]));
    }

    #[test]
    fn test_added_item_skips_foreign_item_before_it() {
        let a = line(0, TacoSize::L, "poulet");
        let decoded = vec![
            a.clone(),
            line(1, TacoSize::Xl, "merguez"),
            line(2, TacoSize::Xxl, "kebab_slug"),
        ];
        let expected_items = [
            expected("A", 0, line_item_identity(&a)),
            expected("B", 1, Some("requested-hash".into())),
        ];

        let rebuilt = match_items("s1", &expected_items, &decoded, Some("B"));
        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt[0].stable_item_id, "A");
        assert_eq!(rebuilt[0].remote_index, 0);
        assert_eq!(rebuilt[1].stable_item_id, "B");
        assert_eq!(rebuilt[1].remote_index, 2);
    }

    #[test]
    fn test_positional_pairing_keeps_order_with_placed_neighbours() {
        let c = line(2, TacoSize::L, "poulet");
        let decoded = vec![
            line(0, TacoSize::Xl, "kebab_slug"),
            line(1, TacoSize::Xl, "merguez"),
            c.clone(),
        ];
        let expected_items = [
            expected("A", 0, Some("requested-hash".into())),
            expected("C", 1, line_item_identity(&c)),
        ];

        let rebuilt = match_items("s1", &expected_items, &decoded, None);
        assert_eq!(rebuilt[0].stable_item_id, "A");
        assert_eq!(rebuilt[0].remote_index, 0);
        assert_eq!(rebuilt[1].stable_item_id, "C");
        assert_eq!(rebuilt[1].remote_index, 2);
    }

    #[test]
    fn test_vanished_items_are_dropped() {
        let decoded = vec![line(0, TacoSize::L, "poulet")];
        let rebuilt = match_items(
            "s1",
            &[expected("A", 0, None), expected("B", 1, None)],
            &decoded,
            None,
        );
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].stable_item_id, "A");
    }

    #[tokio::test]
    async fn test_reconcile_replaces_stored_mapping() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexMappingStore::new(Arc::new(
            TomlIndexMappingRepository::new(temp_dir.path()).unwrap(),
        ));

        store.store("s1", 0, "A", None).await.unwrap();
        store.store("s1", 1, "B", None).await.unwrap();
        store.store("s1", 2, "C", None).await.unwrap();

        // "A" was deleted remotely: the rest shifted down by one.
        let remaining: Vec<_> = store
            .list("s1")
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.stable_item_id != "A")
            .collect();
        let decoded = vec![line(0, TacoSize::L, "kebab"), line(1, TacoSize::Xl, "poulet")];
        store.reconcile("s1", &remaining, &decoded, None).await.unwrap();

        assert_eq!(store.lookup_remote_index("s1", "A").await.unwrap(), None);
        assert_eq!(store.lookup_remote_index("s1", "B").await.unwrap(), Some(0));
        assert_eq!(store.lookup_remote_index("s1", "C").await.unwrap(), Some(1));

        store.remove_all("s1").await.unwrap();
        assert!(store.list("s1").await.unwrap().is_empty());
    }
}
