//! The B+-tree: search, insert, and the split algorithms that keep it
//! balanced. [`Table`] is the thin holder of `root_page_num` and a
//! [`Pager`] that the rest of the module operates on.
use std::path::Path;

use tracing::{debug, trace};

use crate::errors::Error;
use crate::storage::cursor::{self, find_child_index, Cursor};
use crate::storage::node::{
    Node, NodeType, INTERNAL_NODE_MAX_CELLS, INVALID_PAGE_NUM, LEAF_NODE_LEFT_SPLIT_COUNT,
    LEAF_NODE_MAX_CELLS, LEAF_NODE_RIGHT_SPLIT_COUNT,
};
use crate::storage::pager::Pager;
use crate::storage::row::{Row, ROW_SIZE};

pub struct Table {
    pub root_page_num: u32,
    pub pager: Pager,
}

impl Table {
    /// Opens `path`, initializing page 0 as an empty leaf root if the file
    /// is new.
    pub fn open(path: &Path) -> Result<Table, Error> {
        let mut pager = Pager::open(path)?;
        if pager.num_pages() == 0 {
            let page = pager.get(0)?;
            let mut root = Node(page);
            root.init_leaf();
            root.set_is_root(true);
        }
        Ok(Table { root_page_num: 0, pager })
    }

    /// Flushes every populated page and releases the file descriptor.
    pub fn close(self) -> Result<(), Error> {
        self.pager.close()
    }

    /// Inserts `row`, failing with [`Error::DuplicateKey`] if its id is
    /// already present.
    pub fn insert(&mut self, row: &Row) -> Result<(), Error> {
        let key = row.id;
        let row_bytes = row.serialize();
        let cursor = cursor::find(self, key)?;

        let node = Node(self.pager.get(cursor.page_num)?);
        if cursor.cell_num < node.num_cells() && node.leaf_key(cursor.cell_num) == key {
            return Err(Error::DuplicateKey);
        }

        leaf_insert(self, &cursor, key, &row_bytes)
    }

    /// Returns every row, in ascending key order.
    pub fn select_all(&mut self) -> Result<Vec<Row>, Error> {
        let mut rows = Vec::new();
        let mut cursor = cursor::table_start(self)?;
        while !cursor.end_of_table {
            let bytes = cursor::read_value(self, &cursor)?;
            rows.push(Row::deserialize(&bytes));
            cursor::advance(self, &mut cursor)?;
        }
        Ok(rows)
    }

    /// Renders the tree in the documented `.btree` indentation format.
    pub fn render_btree(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        render_node(self, self.root_page_num, 0, &mut out)?;
        Ok(out)
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn render_node(table: &mut Table, page_num: u32, depth: usize, out: &mut String) -> Result<(), Error> {
    let node = Node(table.pager.get(page_num)?);
    match node.node_type() {
        NodeType::Leaf => {
            let num_cells = node.num_cells();
            let keys: Vec<u32> = (0..num_cells).map(|i| node.leaf_key(i)).collect();
            indent(out, depth);
            out.push_str(&format!("- leaf (size {num_cells})\n"));
            for key in keys {
                indent(out, depth + 1);
                out.push_str(&format!("- {key}\n"));
            }
        }
        NodeType::Internal => {
            let num_keys = node.num_keys();
            let children: Vec<(u32, u32)> = (0..num_keys)
                .map(|i| (node.internal_child(i), node.internal_key(i)))
                .collect();
            let right_child = node.right_child();
            indent(out, depth);
            out.push_str(&format!("- internal (size {num_keys})\n"));
            for (child, key) in children {
                render_node(table, child, depth + 1, out)?;
                indent(out, depth + 1);
                out.push_str(&format!("- key {key}\n"));
            }
            render_node(table, right_child, depth + 1, out)?;
        }
    }
    Ok(())
}

/// The true max key of the subtree rooted at `page_num` (recursing into
/// the rightmost child for internal nodes, since internal keys are only
/// separators).
pub(crate) fn node_max_key(table: &mut Table, page_num: u32) -> Result<u32, Error> {
    let node = Node(table.pager.get(page_num)?);
    match node.node_type() {
        NodeType::Leaf => Ok(node.leaf_key(node.num_cells() - 1)),
        NodeType::Internal => {
            let right_child = node.right_child();
            node_max_key(table, right_child)
        }
    }
}

fn leaf_insert(table: &mut Table, cursor: &Cursor, key: u32, row_bytes: &[u8; ROW_SIZE]) -> Result<(), Error> {
    let num_cells = Node(table.pager.get(cursor.page_num)?).num_cells();

    if (num_cells as usize) < LEAF_NODE_MAX_CELLS {
        if cursor.cell_num < num_cells {
            let mut node = Node(table.pager.get(cursor.page_num)?);
            for i in (cursor.cell_num + 1..=num_cells).rev() {
                node.copy_leaf_cell(i - 1, i);
            }
        }
        let mut node = Node(table.pager.get(cursor.page_num)?);
        node.set_num_cells(num_cells + 1);
        node.set_leaf_key(cursor.cell_num, key);
        node.set_leaf_value(cursor.cell_num, row_bytes);
        Ok(())
    } else {
        debug!(page_num = cursor.page_num, "leaf full, splitting");
        leaf_split_and_insert(table, cursor, key, row_bytes)
    }
}

fn leaf_split_and_insert(
    table: &mut Table,
    cursor: &Cursor,
    key: u32,
    row_bytes: &[u8; ROW_SIZE],
) -> Result<(), Error> {
    let old_page_num = cursor.page_num;
    let new_page_num = table.pager.unused_page_num();
    table.pager.get(new_page_num)?;

    let old_max = node_max_key(table, old_page_num)?;
    let old_parent = Node(table.pager.get(old_page_num)?).parent_page_num();
    let old_next_leaf = Node(table.pager.get(old_page_num)?).next_leaf();
    let was_root = Node(table.pager.get(old_page_num)?).is_root();

    // Snapshot the old leaf's pre-split cells before overwriting either buffer.
    let mut old_cells = Vec::with_capacity(LEAF_NODE_MAX_CELLS);
    {
        let old = Node(table.pager.get(old_page_num)?);
        for i in 0..LEAF_NODE_MAX_CELLS as u32 {
            let value: [u8; ROW_SIZE] = old.leaf_value(i).try_into().unwrap();
            old_cells.push((old.leaf_key(i), value));
        }
    }

    {
        let mut new_node = Node(table.pager.get(new_page_num)?);
        new_node.init_leaf();
        new_node.set_parent_page_num(old_parent);
        new_node.set_next_leaf(old_next_leaf);
    }
    {
        let mut old = Node(table.pager.get(old_page_num)?);
        old.set_next_leaf(new_page_num);
    }

    for i in (0..=LEAF_NODE_MAX_CELLS as u32).rev() {
        let dest_is_new = i >= LEAF_NODE_LEFT_SPLIT_COUNT as u32;
        let dest_page = if dest_is_new { new_page_num } else { old_page_num };
        let dest_idx = i % LEAF_NODE_LEFT_SPLIT_COUNT as u32;

        let (k, v) = if i == cursor.cell_num {
            (key, *row_bytes)
        } else if i > cursor.cell_num {
            old_cells[(i - 1) as usize]
        } else {
            old_cells[i as usize]
        };

        let mut node = Node(table.pager.get(dest_page)?);
        node.set_leaf_key(dest_idx, k);
        node.set_leaf_value(dest_idx, &v);
    }

    {
        let mut old = Node(table.pager.get(old_page_num)?);
        old.set_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
    }
    {
        let mut new_node = Node(table.pager.get(new_page_num)?);
        new_node.set_num_cells(LEAF_NODE_RIGHT_SPLIT_COUNT as u32);
    }

    if was_root {
        debug!("leaf split at root, creating new root");
        create_new_root(table, new_page_num)?;
    } else {
        let new_max = node_max_key(table, old_page_num)?;
        update_internal_node_key(table, old_parent, old_max, new_max)?;
        internal_insert(table, old_parent, new_page_num)?;
    }
    Ok(())
}

fn update_internal_node_key(table: &mut Table, page_num: u32, old_key: u32, new_key: u32) -> Result<(), Error> {
    let index = find_child_index(table, page_num, old_key)?;
    let mut node = Node(table.pager.get(page_num)?);
    node.set_internal_key(index, new_key);
    Ok(())
}

fn internal_insert(table: &mut Table, parent_page_num: u32, child_page_num: u32) -> Result<(), Error> {
    let child_max_key = node_max_key(table, child_page_num)?;
    let index = find_child_index(table, parent_page_num, child_max_key)?;
    let num_keys = Node(table.pager.get(parent_page_num)?).num_keys();

    if num_keys as usize >= INTERNAL_NODE_MAX_CELLS {
        return internal_split_and_insert(table, parent_page_num, child_page_num);
    }

    let right_child = Node(table.pager.get(parent_page_num)?).right_child();
    if right_child == INVALID_PAGE_NUM {
        let mut node = Node(table.pager.get(parent_page_num)?);
        node.set_right_child(child_page_num);
        return Ok(());
    }

    let right_child_max = node_max_key(table, right_child)?;
    {
        let mut node = Node(table.pager.get(parent_page_num)?);
        node.set_num_keys(num_keys + 1);
    }

    if child_max_key > right_child_max {
        trace!(parent_page_num, "new child becomes rightmost");
        let mut node = Node(table.pager.get(parent_page_num)?);
        node.set_internal_child(num_keys, right_child);
        node.set_internal_key(num_keys, right_child_max);
        node.set_right_child(child_page_num);
    } else {
        for i in (index..num_keys).rev() {
            let (c, k) = {
                let node = Node(table.pager.get(parent_page_num)?);
                (node.internal_child(i), node.internal_key(i))
            };
            let mut node = Node(table.pager.get(parent_page_num)?);
            node.set_internal_child(i + 1, c);
            node.set_internal_key(i + 1, k);
        }
        let mut node = Node(table.pager.get(parent_page_num)?);
        node.set_internal_child(index, child_page_num);
        node.set_internal_key(index, child_max_key);
    }
    Ok(())
}

fn internal_split_and_insert(table: &mut Table, parent_page_num: u32, child_page_num: u32) -> Result<(), Error> {
    debug!(parent_page_num, child_page_num, "internal node full, splitting");

    let was_root = Node(table.pager.get(parent_page_num)?).is_root();
    let old_max = node_max_key(table, parent_page_num)?;
    let new_page_num = table.pager.unused_page_num();
    {
        // Initialized unconditionally: `create_new_root` expects its right
        // child argument to already be a properly headered node, the same
        // way a freshly split leaf is initialized before being handed to it.
        let mut new_node = Node(table.pager.get(new_page_num)?);
        new_node.init_internal();
    }

    let (old_page_num, key_update_target) = if was_root {
        let left_child_page_num = create_new_root(table, new_page_num)?;
        (left_child_page_num, table.root_page_num)
    } else {
        let grandparent = Node(table.pager.get(parent_page_num)?).parent_page_num();
        {
            let mut new_node = Node(table.pager.get(new_page_num)?);
            new_node.set_parent_page_num(grandparent);
        }
        (parent_page_num, grandparent)
    };

    let old_right_child = Node(table.pager.get(old_page_num)?).right_child();
    internal_insert(table, new_page_num, old_right_child)?;
    {
        let mut child = Node(table.pager.get(old_right_child)?);
        child.set_parent_page_num(new_page_num);
    }
    {
        let mut old = Node(table.pager.get(old_page_num)?);
        old.set_right_child(INVALID_PAGE_NUM);
    }

    let mid = INTERNAL_NODE_MAX_CELLS as u32 / 2;
    for i in (mid..INTERNAL_NODE_MAX_CELLS as u32).rev() {
        let (child, _key) = {
            let node = Node(table.pager.get(old_page_num)?);
            (node.internal_child(i), node.internal_key(i))
        };
        internal_insert(table, new_page_num, child)?;
        {
            let mut moved = Node(table.pager.get(child)?);
            moved.set_parent_page_num(new_page_num);
        }
        let mut old = Node(table.pager.get(old_page_num)?);
        let num_keys = old.num_keys();
        old.set_num_keys(num_keys - 1);
    }

    {
        let mut old = Node(table.pager.get(old_page_num)?);
        let new_right_child = old.internal_child(old.num_keys() - 1);
        old.set_right_child(new_right_child);
        let num_keys = old.num_keys();
        old.set_num_keys(num_keys - 1);
    }

    let child_max_key = node_max_key(table, child_page_num)?;
    let max_after_split = node_max_key(table, old_page_num)?;
    let destination = if child_max_key < max_after_split { old_page_num } else { new_page_num };
    internal_insert(table, destination, child_page_num)?;
    {
        let mut child = Node(table.pager.get(child_page_num)?);
        child.set_parent_page_num(destination);
    }

    let new_max_of_old = node_max_key(table, old_page_num)?;
    update_internal_node_key(table, key_update_target, old_max, new_max_of_old)?;

    if !was_root {
        internal_insert(table, key_update_target, new_page_num)?;
        let mut new_node = Node(table.pager.get(new_page_num)?);
        new_node.set_parent_page_num(key_update_target);
    }
    Ok(())
}

/// Re-initializes page 0 as an internal root over the old root's content
/// (copied into a fresh left child) and `right_child_page_num`. Returns the
/// new left child's page number.
fn create_new_root(table: &mut Table, right_child_page_num: u32) -> Result<u32, Error> {
    let left_child_page_num = table.pager.unused_page_num();
    table.pager.get(left_child_page_num)?;

    let root_snapshot = *table.pager.get(table.root_page_num)?;
    {
        let left_buf = table.pager.get(left_child_page_num)?;
        *left_buf = root_snapshot;
    }
    {
        let mut left = Node(table.pager.get(left_child_page_num)?);
        left.set_is_root(false);
    }

    let is_internal_copy = Node(table.pager.get(left_child_page_num)?).node_type() == NodeType::Internal;
    if is_internal_copy {
        let num_keys = Node(table.pager.get(left_child_page_num)?).num_keys();
        for i in 0..=num_keys {
            let child = Node(table.pager.get(left_child_page_num)?).internal_child(i);
            let mut child_node = Node(table.pager.get(child)?);
            child_node.set_parent_page_num(left_child_page_num);
        }
    }

    let left_max_key = node_max_key(table, left_child_page_num)?;

    {
        let mut root = Node(table.pager.get(table.root_page_num)?);
        root.init_internal();
        root.set_is_root(true);
        root.set_num_keys(1);
        root.set_internal_child(0, left_child_page_num);
        root.set_internal_key(0, left_max_key);
        root.set_right_child(right_child_page_num);
    }

    {
        let mut left = Node(table.pager.get(left_child_page_num)?);
        left.set_parent_page_num(table.root_page_num);
    }
    {
        let mut right = Node(table.pager.get(right_child_page_num)?);
        right.set_parent_page_num(table.root_page_num);
    }

    Ok(left_child_page_num)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn row(id: u32) -> Row {
        Row::parse(&id.to_string(), "user", "user@example.com").unwrap()
    }

    #[test]
    fn single_row_round_trips() {
        let tmp = NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        table.insert(&row(1)).unwrap();
        let rows = table.select_all().unwrap();
        assert_eq!(rows, vec![row(1)]);
    }

    #[test]
    fn duplicate_insert_is_rejected_and_tree_unchanged() {
        let tmp = NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        table.insert(&row(1)).unwrap();
        assert!(matches!(table.insert(&row(1)), Err(Error::DuplicateKey)));
        assert_eq!(table.select_all().unwrap(), vec![row(1)]);
    }

    #[test]
    fn out_of_order_inserts_come_back_sorted() {
        let tmp = NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        for id in [5, 1, 4, 2, 3] {
            table.insert(&row(id)).unwrap();
        }
        let ids: Vec<u32> = table.select_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn fourteen_inserts_split_into_two_leaves_under_one_internal_root() {
        let tmp = NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        for id in 1..=14 {
            table.insert(&row(id)).unwrap();
        }
        let ids: Vec<u32> = table.select_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=14).collect::<Vec<_>>());

        let root = Node(table.pager.get(0).unwrap());
        assert_eq!(root.node_type(), NodeType::Internal);
        assert_eq!(root.num_keys(), 1);
        assert_eq!(root.internal_key(0), 7);
    }

    #[test]
    fn thirty_keys_in_scrambled_order_build_a_multi_level_tree_and_scan_sorted() {
        let tmp = NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        let order = [
            13, 2, 27, 5, 30, 1, 19, 8, 24, 3, 16, 22, 9, 29, 4, 11, 6, 25, 14, 18, 7, 21, 10, 28,
            15, 20, 12, 26, 17, 23,
        ];
        for id in order {
            table.insert(&row(id)).unwrap();
        }
        let ids: Vec<u32> = table.select_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=30).collect::<Vec<_>>());
    }

    #[test]
    fn close_and_reopen_preserves_rows() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let mut table = Table::open(tmp.path()).unwrap();
            for id in [1, 2, 3] {
                table.insert(&row(id)).unwrap();
            }
            table.close().unwrap();
        }
        let mut table = Table::open(tmp.path()).unwrap();
        let ids: Vec<u32> = table.select_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
