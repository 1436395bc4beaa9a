/// One row of `kubectl top nodes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMetrics {
    pub name: String,
    pub cpu: String,
    pub cpu_percent: String,
    pub memory: String,
    pub memory_percent: String,
}

/// One row of `kubectl top pods`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodMetrics {
    pub name: String,
    pub cpu: String,
    pub memory: String,
}

/// Split table output into column vectors with at least `min_columns` fields
///
/// Blank lines, a `NAME ...` header and short lines are dropped.
fn rows(stdout: &str, min_columns: usize) -> impl Iterator<Item = Vec<&str>> {
    stdout
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .filter(move |parts| parts.len() >= min_columns)
        .filter(|parts| parts[0] != "NAME")
}

pub fn parse_top_nodes(stdout: &str) -> Vec<NodeMetrics> {
    rows(stdout, 5)
        .map(|parts| NodeMetrics {
            name: parts[0].to_string(),
            cpu: parts[1].to_string(),
            cpu_percent: parts[2].to_string(),
            memory: parts[3].to_string(),
            memory_percent: parts[4].to_string(),
        })
        .collect()
}

pub fn parse_top_pods(stdout: &str) -> Vec<PodMetrics> {
    rows(stdout, 3)
        .map(|parts| PodMetrics {
            name: parts[0].to_string(),
            cpu: parts[1].to_string(),
            memory: parts[2].to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top_nodes() {
        let out = "node-a   250m   6%    2048Mi   13%\n\
                   node-b   1200m  30%   8000Mi   51%\n";
        let nodes = parse_top_nodes(out);
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[1],
            NodeMetrics {
                name: "node-b".to_string(),
                cpu: "1200m".to_string(),
                cpu_percent: "30%".to_string(),
                memory: "8000Mi".to_string(),
                memory_percent: "51%".to_string(),
            }
        );
    }

    #[test]
    fn test_short_and_blank_lines_are_skipped() {
        let out = "node-a 250m 6% 2048Mi\n\n   \nnode-b 1m 0% 10Mi 1%\ngarbage\n";
        let nodes = parse_top_nodes(out);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "node-b");
    }

    #[test]
    fn test_header_is_skipped() {
        let out = "NAME                CPU(cores)   MEMORY(bytes)\n\
                   sas-logon-app-abc   12m          300Mi\n";
        let pods = parse_top_pods(out);
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].memory, "300Mi");
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_top_nodes("").is_empty());
        assert!(parse_top_pods("\n").is_empty());
    }
}
