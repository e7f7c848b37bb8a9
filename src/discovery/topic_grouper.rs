//! 按文件名推断主题并分组
//!
//! 两个文件的词元集合有交集即视为相邻，连通分量即为一组。
//! 每个输入文件恰好出现在一个组中。

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::models::FileGroup;
use crate::utils::title_case;

/// 过于通用、不参与主题推断的词
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "in", "on", "at", "to", "for", "with", "by", "from",
    "is", "are", "was", "were", "be", "been", "this", "that", "it", "its", "as", "up", "out",
    "if", "so", "pdf", "doc", "document", "file", "report", "paper", "draft", "final", "v1",
    "v2", "v3", "copy", "new", "old", "rev",
];

const MIN_TOKEN_LEN: usize = 3;

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\-]+").expect("invalid separator regex"));

/// 把文件名主干切成小写词元
///
/// 先按非字母数字字符切分，再按数字/字母边界切分，
/// 丢弃过短的、停用词以及纯数字。
pub fn tokenize(stem: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for part in stem.split(|c: char| !c.is_alphanumeric()) {
        for piece in split_digit_boundaries(part) {
            let token = piece.to_lowercase();
            if token.chars().count() >= MIN_TOKEN_LEN
                && !STOP_WORDS.contains(&token.as_str())
                && !token.chars().all(|c| c.is_ascii_digit())
            {
                tokens.push(token);
            }
        }
    }
    tokens
}

fn split_digit_boundaries(part: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut prev_digit: Option<bool> = None;
    for (idx, c) in part.char_indices() {
        let is_digit = c.is_ascii_digit();
        if let Some(prev) = prev_digit {
            if prev != is_digit {
                pieces.push(&part[start..idx]);
                start = idx;
            }
        }
        prev_digit = Some(is_digit);
    }
    if start < part.len() {
        pieces.push(&part[start..]);
    }
    pieces
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// 从单个文件名推断主题：词元优先，否则使用原始文件名
pub fn topic_from_stem(stem: &str) -> String {
    let tokens = tokenize(stem);
    if !tokens.is_empty() {
        return title_case(&tokens.join(" "));
    }
    title_case(SEPARATOR_RUN.replace_all(stem, " ").trim())
}

/// 对文件列表分组
///
/// 组内文件保持输入顺序，组按各自第一个文件在输入中的位置排序。
pub fn group_by_topic(paths: &[PathBuf]) -> Vec<FileGroup> {
    match paths {
        [] => return Vec::new(),
        [single] => {
            return vec![FileGroup::new(
                topic_from_stem(&file_stem(single)),
                vec![single.clone()],
            )]
        }
        _ => {}
    }

    let token_sets: Vec<HashSet<String>> = paths
        .iter()
        .map(|p| tokenize(&file_stem(p)).into_iter().collect())
        .collect();

    let n = paths.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if !token_sets[i].is_disjoint(&token_sets[j]) {
                adjacency[i].push(j);
                adjacency[j].push(i);
            }
        }
    }

    let mut visited = vec![false; n];
    let mut groups = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        visited[start] = true;
        while let Some(node) = queue.pop_front() {
            component.push(node);
            for &next in &adjacency[node] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
        component.sort_unstable();

        let topic = cluster_topic(&component, &token_sets, paths);
        let members = component.iter().map(|&i| paths[i].clone()).collect();
        groups.push(FileGroup::new(topic, members));
    }

    groups
}

fn cluster_topic(component: &[usize], token_sets: &[HashSet<String>], paths: &[PathBuf]) -> String {
    let mut common: BTreeSet<&String> = token_sets[component[0]].iter().collect();
    for &i in &component[1..] {
        common.retain(|token| token_sets[i].contains(*token));
    }

    if common.is_empty() {
        topic_from_stem(&file_stem(&paths[component[0]]))
    } else {
        let joined: Vec<&str> = common.iter().map(|s| s.as_str()).collect();
        title_case(&joined.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/tmp/dl/{n}"))).collect()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Kubernetes_Report2024-final"),
            vec!["kubernetes".to_string()]
        );
        assert_eq!(tokenize("ml-notes v2"), vec!["notes".to_string()]);
        assert_eq!(tokenize("the pdf 123"), Vec::<String>::new());
        assert_eq!(tokenize("Chapter01Intro"), vec!["chapter", "intro"]);
    }

    #[test]
    fn test_empty_and_single() {
        assert!(group_by_topic(&[]).is_empty());

        let groups = group_by_topic(&paths(&["machine_learning_basics.pdf"]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].topic, "Machine Learning Basics");
    }

    #[test]
    fn test_groups_by_shared_tokens() {
        let input = paths(&[
            "kubernetes_networking.pdf",
            "cooking-pasta.pdf",
            "kubernetes-storage.pdf",
            "pasta_sauces.pdf",
            "zzz.pdf",
        ]);
        let groups = group_by_topic(&input);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].topic, "Kubernetes");
        assert_eq!(groups[0].paths, vec![input[0].clone(), input[2].clone()]);
        assert_eq!(groups[1].topic, "Pasta");
        assert_eq!(groups[1].paths, vec![input[1].clone(), input[3].clone()]);
        assert_eq!(groups[2].topic, "Zzz");
    }

    #[test]
    fn test_transitive_cluster_falls_back_to_first_member() {
        // a-b 共享 rust，b-c 共享 async，三者没有公共词元
        let input = paths(&["rust_ownership.pdf", "rust_async.pdf", "async_python.pdf"]);
        let groups = group_by_topic(&input);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].topic, "Rust Ownership");
        assert_eq!(groups[0].paths, input);
    }

    #[test]
    fn test_raw_name_fallback() {
        let input = paths(&["v1_of.pdf", "x-y.pdf"]);
        let groups = group_by_topic(&input);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].topic, "V1 Of");
        assert_eq!(groups[1].topic, "X Y");
    }

    #[test]
    fn test_grouping_is_partition_and_stable() {
        let input = paths(&[
            "distributed_systems_ch1.pdf",
            "distributed-systems-ch2.pdf",
            "cloud_native.pdf",
            "notes.pdf",
            "cloud_costs.pdf",
            "misc.pdf",
        ]);
        let first = group_by_topic(&input);
        let second = group_by_topic(&input);
        assert_eq!(first, second);

        let mut seen: Vec<PathBuf> = first.iter().flat_map(|g| g.paths.clone()).collect();
        seen.sort();
        let mut expected = input.clone();
        expected.sort();
        assert_eq!(seen, expected);
    }
}
