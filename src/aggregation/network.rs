//! Entity co-occurrence graph.
//!
//! Co-occurrence is counted at article granularity: an article contributes
//! at most one to a node's weight and at most one to any pair's weight, no
//! matter how often the entities repeat inside it.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use super::filter::MentionFilter;
use crate::models::{normalize_surface, EntityMention, EntityType};

/// Group label carried by the searched entity's node.
pub const SEARCHED_GROUP: &str = "SEARCHED";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub group: String,
    pub article_count: usize,
    pub is_queried: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub a: String,
    pub b: String,
    pub weight: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl NetworkGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Weight of the undirected edge between two node ids, zero when absent.
    pub fn edge_weight(&self, x: &str, y: &str) -> usize {
        self.edges
            .iter()
            .find(|e| (e.a == x && e.b == y) || (e.a == y && e.b == x))
            .map_or(0, |e| e.weight)
    }
}

#[derive(Debug)]
struct NodeStats {
    display: String,
    articles: usize,
    /// Mention count per type, in first-seen order.
    types: Vec<(EntityType, usize)>,
}

impl NodeStats {
    fn new(display: &str) -> Self {
        Self {
            display: display.to_string(),
            articles: 0,
            types: Vec::new(),
        }
    }

    fn observe_type(&mut self, entity_type: EntityType) {
        match self.types.iter_mut().find(|(t, _)| *t == entity_type) {
            Some((_, n)) => *n += 1,
            None => self.types.push((entity_type, 1)),
        }
    }

    fn dominant_type(&self) -> Option<EntityType> {
        let mut best: Option<(EntityType, usize)> = None;
        for &(t, n) in &self.types {
            if best.map_or(true, |(_, m)| n > m) {
                best = Some((t, n));
            }
        }
        best.map(|(t, _)| t)
    }
}

/// Build the co-occurrence graph around `query`.
///
/// `mentions` are all mentions of the candidate articles (already restricted
/// to the date range). An article qualifies when it holds a mention of the
/// query entity whose confidence passes the filter; the type and exclusion
/// clauses apply only to the entities co-occurring with it.
///
/// Weights are computed over the full qualifying set. Dropping the searched
/// node (`include_queried == false`, or the query listed as excluded) only
/// removes it and its edges from the output.
pub fn build_network(
    query: &str,
    mentions: &[EntityMention],
    filter: &MentionFilter,
    include_queried: bool,
) -> NetworkGraph {
    let query_key = normalize_surface(query);
    if query_key.is_empty() {
        return NetworkGraph::default();
    }

    let mut by_article: BTreeMap<i32, Vec<&EntityMention>> = BTreeMap::new();
    for mention in mentions {
        by_article.entry(mention.article_id).or_default().push(mention);
    }

    let mut nodes: HashMap<String, NodeStats> = HashMap::new();
    let mut pairs: HashMap<(String, String), usize> = HashMap::new();

    for article_mentions in by_article.values_mut() {
        article_mentions.sort_by_key(|m| m.id);

        let Some(anchor) = article_mentions
            .iter()
            .find(|m| m.normalized_text == query_key && filter.confidence_ok(m))
        else {
            continue;
        };

        let mut present: Vec<&str> = vec![query_key.as_str()];
        let mut seen: HashSet<&str> = HashSet::from([query_key.as_str()]);
        nodes
            .entry(query_key.clone())
            .or_insert_with(|| NodeStats::new(&anchor.surface_text));

        for mention in article_mentions.iter() {
            let key = mention.normalized_text.as_str();
            if key == query_key || !filter.admits(mention) {
                continue;
            }
            nodes
                .entry(key.to_string())
                .or_insert_with(|| NodeStats::new(&mention.surface_text))
                .observe_type(mention.entity_type);
            if seen.insert(key) {
                present.push(key);
            }
        }

        for key in &present {
            if let Some(stats) = nodes.get_mut(*key) {
                stats.articles += 1;
            }
        }

        present.sort_unstable();
        for (i, a) in present.iter().enumerate() {
            for b in &present[i + 1..] {
                *pairs.entry((a.to_string(), b.to_string())).or_insert(0) += 1;
            }
        }
    }

    if nodes.is_empty() {
        return NetworkGraph::default();
    }

    let show_queried = include_queried && !filter.is_excluded(&query_key);

    let mut graph = NetworkGraph::default();
    for (key, stats) in &nodes {
        let is_queried = *key == query_key;
        if is_queried && !show_queried {
            continue;
        }
        let group = if is_queried {
            SEARCHED_GROUP.to_string()
        } else {
            stats
                .dominant_type()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default()
        };
        graph.nodes.push(GraphNode {
            id: stats.display.clone(),
            group,
            article_count: stats.articles,
            is_queried,
        });
    }

    for ((a, b), weight) in pairs {
        if !show_queried && (a == query_key || b == query_key) {
            continue;
        }
        let (Some(a), Some(b)) = (nodes.get(&a), nodes.get(&b)) else {
            continue;
        };
        graph.edges.push(GraphEdge {
            a: a.display.clone(),
            b: b.display.clone(),
            weight,
        });
    }

    graph
        .nodes
        .sort_by(|x, y| y.article_count.cmp(&x.article_count).then_with(|| x.id.cmp(&y.id)));
    graph.edges.sort_by(|x, y| {
        y.weight
            .cmp(&x.weight)
            .then_with(|| x.a.cmp(&y.a))
            .then_with(|| x.b.cmp(&y.b))
    });

    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        mentions: Vec<EntityMention>,
    }

    impl Fixture {
        fn new() -> Self {
            Self { mentions: Vec::new() }
        }

        fn mention(mut self, article_id: i32, text: &str, t: EntityType, confidence: f64) -> Self {
            let id = self.mentions.len() as i32 + 1;
            self.mentions.push(EntityMention {
                id,
                article_id,
                surface_text: text.to_string(),
                normalized_text: normalize_surface(text),
                entity_type: t,
                confidence,
                start_char: 0,
                end_char: text.len() as i32,
            });
            self
        }
    }

    fn jokowi_kpu() -> Fixture {
        Fixture::new()
            .mention(1, "Jokowi", EntityType::Person, 0.99)
            .mention(2, "Jokowi", EntityType::Person, 0.98)
            .mention(2, "KPU", EntityType::Organization, 0.95)
            .mention(3, "Jokowi", EntityType::Person, 0.97)
            .mention(3, "KPU", EntityType::Organization, 0.91)
            .mention(3, "KPU", EntityType::Organization, 0.93)
            .mention(4, "KPU", EntityType::Organization, 0.96)
    }

    #[test]
    fn test_edge_weight_counts_shared_articles_only() {
        let fx = jokowi_kpu();
        let graph = build_network("Jokowi", &fx.mentions, &MentionFilter::new(), true);

        assert_eq!(graph.edge_weight("Jokowi", "KPU"), 2);
        assert_eq!(graph.node("Jokowi").unwrap().article_count, 3);
        // A4 has no Jokowi mention and contributes nothing.
        assert_eq!(graph.node("KPU").unwrap().article_count, 2);
    }

    #[test]
    fn test_searched_node_tagged() {
        let fx = jokowi_kpu();
        let graph = build_network("jokowi", &fx.mentions, &MentionFilter::new(), true);

        let searched = graph.node("Jokowi").unwrap();
        assert!(searched.is_queried);
        assert_eq!(searched.group, SEARCHED_GROUP);
        let kpu = graph.node("KPU").unwrap();
        assert!(!kpu.is_queried);
        assert_eq!(kpu.group, "ORG");
    }

    #[test]
    fn test_symmetry_and_bound() {
        let fx = Fixture::new()
            .mention(1, "Jokowi", EntityType::Person, 0.9)
            .mention(1, "KPU", EntityType::Organization, 0.9)
            .mention(1, "Jakarta", EntityType::Location, 0.9)
            .mention(2, "Jokowi", EntityType::Person, 0.9)
            .mention(2, "Jakarta", EntityType::Location, 0.9)
            .mention(3, "Jokowi", EntityType::Person, 0.9)
            .mention(3, "Bawaslu", EntityType::Organization, 0.9)
            .mention(3, "KPU", EntityType::Organization, 0.9);
        let graph = build_network("Jokowi", &fx.mentions, &MentionFilter::new(), true);

        for x in &graph.nodes {
            for y in &graph.nodes {
                assert_eq!(graph.edge_weight(&x.id, &y.id), graph.edge_weight(&y.id, &x.id));
            }
            let max_edge = graph
                .nodes
                .iter()
                .map(|y| graph.edge_weight(&x.id, &y.id))
                .max()
                .unwrap_or(0);
            assert!(x.article_count >= max_edge);
        }
        assert_eq!(graph.edge_weight("KPU", "Jakarta"), 1);
        assert_eq!(graph.edge_weight("KPU", "Bawaslu"), 1);
    }

    #[test]
    fn test_no_qualifying_mentions_yields_empty_graph() {
        let fx = jokowi_kpu();
        let graph = build_network("Prabowo", &fx.mentions, &MentionFilter::new(), true);
        assert!(graph.is_empty());

        let strict = MentionFilter::new().with_confidence(0.995, 1.0);
        assert!(build_network("Jokowi", &fx.mentions, &strict, true).is_empty());
    }

    #[test]
    fn test_confidence_bounds_apply_to_anchor() {
        let fx = Fixture::new()
            .mention(1, "Jokowi", EntityType::Person, 0.4)
            .mention(1, "KPU", EntityType::Organization, 0.9)
            .mention(2, "Jokowi", EntityType::Person, 0.9)
            .mention(2, "KPU", EntityType::Organization, 0.9);
        let filter = MentionFilter::new().with_confidence(0.5, 1.0);
        let graph = build_network("Jokowi", &fx.mentions, &filter, true);
        assert_eq!(graph.edge_weight("Jokowi", "KPU"), 1);
    }

    #[test]
    fn test_excluding_searched_node_keeps_other_weights() {
        let fx = jokowi_kpu().mention(3, "Jakarta", EntityType::Location, 0.9);
        let full = build_network("Jokowi", &fx.mentions, &MentionFilter::new(), true);
        let hidden = build_network("Jokowi", &fx.mentions, &MentionFilter::new(), false);
        let excluded = build_network(
            "Jokowi",
            &fx.mentions,
            &MentionFilter::new().excluding(["JOKOWI"]),
            true,
        );

        for graph in [&hidden, &excluded] {
            assert!(graph.node("Jokowi").is_none());
            assert_eq!(graph.edge_weight("Jokowi", "KPU"), 0);
            assert_eq!(
                graph.node("KPU").unwrap().article_count,
                full.node("KPU").unwrap().article_count
            );
            assert_eq!(graph.edge_weight("KPU", "Jakarta"), 1);
        }
    }

    #[test]
    fn test_type_and_exclusion_filters() {
        let fx = jokowi_kpu()
            .mention(2, "Jakarta", EntityType::Location, 0.9)
            .mention(3, "##wi", EntityType::Person, 0.9);
        let filter = MentionFilter::new().with_types([EntityType::Location]);
        let graph = build_network("Jokowi", &fx.mentions, &filter, true);

        assert!(graph.node("KPU").is_none());
        assert!(graph.node("##wi").is_none());
        assert_eq!(graph.edge_weight("Jokowi", "Jakarta"), 1);
        // Searched node survives a type filter that excludes its own type.
        assert_eq!(graph.node("Jokowi").unwrap().article_count, 3);

        let graph = build_network(
            "Jokowi",
            &fx.mentions,
            &MentionFilter::new().excluding(["kpu"]),
            true,
        );
        assert!(graph.node("KPU").is_none());
        assert!(graph.node("Jakarta").is_some());
    }

    #[test]
    fn test_node_identity_is_case_insensitive() {
        let fx = Fixture::new()
            .mention(1, "Jokowi", EntityType::Person, 0.9)
            .mention(1, "Komisi Pemilihan Umum", EntityType::Organization, 0.9)
            .mention(2, "jokowi", EntityType::Person, 0.9)
            .mention(2, "komisi  pemilihan umum", EntityType::Location, 0.9)
            .mention(3, "Jokowi", EntityType::Person, 0.9)
            .mention(3, "KOMISI PEMILIHAN UMUM", EntityType::Organization, 0.9);
        let graph = build_network("Jokowi", &fx.mentions, &MentionFilter::new(), true);

        assert_eq!(graph.nodes.len(), 2);
        let node = graph.node("Komisi Pemilihan Umum").unwrap();
        assert_eq!(node.article_count, 3);
        assert_eq!(node.group, "ORG");
    }

    #[test]
    fn test_output_order_is_deterministic() {
        let fx = jokowi_kpu()
            .mention(1, "Bawaslu", EntityType::Organization, 0.9)
            .mention(2, "Bawaslu", EntityType::Organization, 0.9);
        let graph = build_network("Jokowi", &fx.mentions, &MentionFilter::new(), true);

        let ids: Vec<_> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["Jokowi", "Bawaslu", "KPU"]);
        let edges: Vec<_> = graph
            .edges
            .iter()
            .map(|e| (e.a.as_str(), e.b.as_str(), e.weight))
            .collect();
        assert_eq!(
            edges,
            [
                ("Bawaslu", "Jokowi", 2),
                ("Jokowi", "KPU", 2),
                ("Bawaslu", "KPU", 1),
            ]
        );
    }
}
