//! Folder traversal: root listing, breadth-first child expansion, flattening.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::models::{FileEntry, ListResponse, RawEntry, ShareInfoResponse, ShareListing, ShareMeta};

/// Pending node of the tree under construction.
struct Node {
    entry: FileEntry,
    children: Vec<usize>,
    depth: usize,
}

/// Lists the contents of a share into a [`FileEntry`] tree.
#[derive(Clone)]
pub struct FolderTraversal {
    http: Client,
    config: Arc<ResolverConfig>,
}

impl FolderTraversal {
    pub fn new(http: Client, config: Arc<ResolverConfig>) -> Self {
        Self { http, config }
    }

    /// List the share root and expand every directory below it.
    pub async fn list_root(&self, short_code: &str) -> Result<ShareListing> {
        self.list_root_with_cancel(short_code, &CancellationToken::new())
            .await
    }

    /// Like [`list_root`](Self::list_root), stopping between tree levels
    /// once `cancel` fires.
    pub async fn list_root_with_cancel(
        &self,
        short_code: &str,
        cancel: &CancellationToken,
    ) -> Result<ShareListing> {
        let shorturl = format!("1{}", short_code);
        let response = self
            .http
            .get(format!("{}/api/shorturlinfo", self.config.www_base))
            .query(&[
                ("app_id", self.config.app_id.as_str()),
                ("shorturl", shorturl.as_str()),
                ("root", "1"),
            ])
            .send()
            .await?;

        let info: ShareInfoResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::from_body(e, "share info"))?;

        if info.errno != 0 {
            warn!(short_code, errno = info.errno, "share info rejected");
            return Err(ResolveError::NoFilesFound);
        }

        let roots = to_entries(&info.list);
        if roots.is_empty() {
            return Err(ResolveError::NoFilesFound);
        }

        let meta = ShareMeta {
            share_id: info.shareid.unwrap_or_default(),
            uk: info.uk.unwrap_or_default(),
            sign: info.sign.unwrap_or_default(),
            timestamp: info.timestamp.unwrap_or_default(),
        };

        let entries = self.expand(short_code, roots, cancel).await?;
        Ok(ShareListing { meta, entries })
    }

    /// List one directory. Failures are logged and yield an empty listing.
    pub async fn list_children(&self, short_code: &str, path: &str) -> Vec<FileEntry> {
        match self.try_list_children(short_code, path).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(short_code, path, error = %e, "child listing failed, keeping partial result");
                Vec::new()
            }
        }
    }

    async fn try_list_children(&self, short_code: &str, path: &str) -> Result<Vec<FileEntry>> {
        let response = self
            .http
            .get(format!("{}/share/list", self.config.www_base))
            .query(&[
                ("app_id", self.config.app_id.as_str()),
                ("shorturl", short_code),
                ("root", "0"),
                ("dir", path),
            ])
            .send()
            .await?;

        let listing: ListResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::from_body(e, "listing"))?;

        if listing.errno != 0 {
            return Err(ResolveError::UpstreamRejected(format!(
                "errno {}: {}",
                listing.errno,
                listing.errmsg.unwrap_or_default()
            )));
        }

        Ok(to_entries(&listing.list))
    }

    /// Expand directories level by level. Listings within a level run
    /// concurrently but are attached in discovery order.
    async fn expand(
        &self,
        short_code: &str,
        roots: Vec<FileEntry>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileEntry>> {
        let max_entries = self.config.max_entries.max(1);
        let concurrency = self.config.listing_concurrency.max(1);

        let mut arena: Vec<Node> = Vec::new();
        let mut root_ids = Vec::new();
        let mut frontier = Vec::new();

        if roots.len() > max_entries {
            warn!(max_entries, roots = roots.len(), "entry limit reached, listing truncated");
        }

        for entry in roots.into_iter().take(max_entries) {
            let id = arena.len();
            if entry.is_directory {
                frontier.push(id);
            }
            arena.push(Node {
                entry,
                children: Vec::new(),
                depth: 1,
            });
            root_ids.push(id);
        }

        let mut total = arena.len();
        let mut truncated = false;

        while !frontier.is_empty() && !truncated {
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            let (expandable, too_deep): (Vec<usize>, Vec<usize>) = frontier
                .drain(..)
                .partition(|&id| arena[id].depth < self.config.max_depth);

            for id in too_deep {
                warn!(path = %arena[id].entry.path, max_depth = self.config.max_depth, "depth limit reached, not descending");
            }

            let paths: Vec<(usize, String)> = expandable
                .into_iter()
                .map(|id| (id, arena[id].entry.path.clone()))
                .collect();

            let listings: Vec<Vec<FileEntry>> = stream::iter(
                paths
                    .iter()
                    .map(|(_, path)| self.list_children(short_code, path)),
            )
            .buffered(concurrency)
            .collect()
            .await;

            let mut next = Vec::new();
            'attach: for ((parent, _), children) in paths.iter().zip(listings) {
                let depth = arena[*parent].depth + 1;
                for child in children {
                    if total >= max_entries {
                        warn!(max_entries, "entry limit reached, listing truncated");
                        truncated = true;
                        break 'attach;
                    }
                    let id = arena.len();
                    if child.is_directory {
                        next.push(id);
                    }
                    arena.push(Node {
                        entry: child,
                        children: Vec::new(),
                        depth,
                    });
                    arena[*parent].children.push(id);
                    total += 1;
                }
            }

            frontier = next;
        }

        debug!(short_code, entries = total, "share tree listed");
        Ok(assemble(arena, &root_ids))
    }
}

/// Turn the arena back into nested entries. Children always have higher ids
/// than their parent, so building from the back completes them first.
fn assemble(mut arena: Vec<Node>, root_ids: &[usize]) -> Vec<FileEntry> {
    let mut built: Vec<Option<FileEntry>> = (0..arena.len()).map(|_| None).collect();

    while let Some(node) = arena.pop() {
        let id = arena.len();
        let mut entry = node.entry;
        entry.children = node
            .children
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[id] = Some(entry);
    }

    root_ids.iter().filter_map(|&id| built[id].take()).collect()
}

fn to_entries(raw: &[RawEntry]) -> Vec<FileEntry> {
    raw.iter()
        .filter_map(|item| {
            let entry = FileEntry::from_raw(item);
            if entry.is_none() {
                warn!(?item, "skipping malformed listing entry");
            }
            entry
        })
        .collect()
}

/// Collect leaf entries breadth-first, in discovery order.
pub fn flatten(tree: &[FileEntry]) -> Vec<FileEntry> {
    let mut queue: VecDeque<&FileEntry> = tree.iter().collect();
    let mut leaves = Vec::new();

    while let Some(entry) = queue.pop_front() {
        if entry.is_directory {
            queue.extend(entry.children.iter());
        } else {
            leaves.push(entry.clone());
        }
    }

    leaves
}

/// A share is folder-shaped when it holds a directory or more than one file.
pub fn is_folder_shaped(entries: &[FileEntry]) -> bool {
    entries.iter().any(|e| e.is_directory) || entries.len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(path: &str, fs_id: u64) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            fs_id,
            name: path.rsplit('/').next().unwrap().to_string(),
            size_bytes: Some(fs_id * 100),
            is_directory: false,
            children: Vec::new(),
        }
    }

    fn dir(path: &str, fs_id: u64, children: Vec<FileEntry>) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            fs_id,
            name: path.rsplit('/').next().unwrap().to_string(),
            size_bytes: None,
            is_directory: true,
            children,
        }
    }

    #[test]
    fn test_flatten_breadth_first() {
        let tree = vec![
            dir(
                "/a",
                1,
                vec![dir("/a/deep", 2, vec![leaf("/a/deep/z.bin", 3)]), leaf("/a/x.bin", 4)],
            ),
            leaf("/top.bin", 5),
            dir("/b", 6, vec![leaf("/b/y.bin", 7)]),
        ];

        let names: Vec<String> = flatten(&tree).into_iter().map(|e| e.path).collect();
        assert_eq!(names, vec!["/top.bin", "/a/x.bin", "/b/y.bin", "/a/deep/z.bin"]);
    }

    #[test]
    fn test_flatten_only_leaves() {
        let tree = vec![dir("/empty", 1, vec![]), dir("/d", 2, vec![dir("/d/e", 3, vec![])])];
        assert!(flatten(&tree).is_empty());
    }

    #[test]
    fn test_is_folder_shaped() {
        assert!(!is_folder_shaped(&[leaf("/one.mp4", 1)]));
        assert!(is_folder_shaped(&[leaf("/one.mp4", 1), leaf("/two.mp4", 2)]));
        assert!(is_folder_shaped(&[dir("/d", 1, vec![])]));
    }

    #[test]
    fn test_assemble_preserves_order() {
        let arena = vec![
            Node { entry: dir("/a", 1, vec![]), children: vec![2, 3], depth: 1 },
            Node { entry: leaf("/b", 2), children: vec![], depth: 1 },
            Node { entry: leaf("/a/1", 3), children: vec![], depth: 2 },
            Node { entry: leaf("/a/2", 4), children: vec![], depth: 2 },
        ];
        let tree = assemble(arena, &[0, 1]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[0].path, "/a/1");
        assert_eq!(tree[0].children[1].path, "/a/2");
        assert_eq!(tree[1].path, "/b");
    }
}
