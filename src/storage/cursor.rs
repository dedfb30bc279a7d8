//! Ordered scan cursor over a table's leaf chain.
use crate::errors::Error;
use crate::storage::node::{Node, NodeType};
use crate::storage::row::ROW_SIZE;
use crate::storage::table::Table;

/// A position within a table: a page, a cell within that page, and whether
/// the position is one past the last row.
///
/// Unlike a borrowing cursor, this is plain data — callers pass the `Table`
/// they're navigating to each function explicitly. That sidesteps a
/// self-referential lifetime (the cursor would otherwise need to borrow the
/// same table its own methods mutate) and matches the underlying model: a
/// cursor is just `(page_num, cell_num)` coordinates, nothing more.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

/// Descends from the root to the leaf position where `key` belongs: its
/// existing cell if present, otherwise its insertion point.
pub fn find(table: &mut Table, key: u32) -> Result<Cursor, Error> {
    let mut page_num = table.root_page_num;
    loop {
        let node_type = Node(table.pager.get(page_num)?).node_type();
        match node_type {
            NodeType::Leaf => return Ok(find_in_leaf(table, page_num, key)?),
            NodeType::Internal => {
                let index = find_child_index(table, page_num, key)?;
                page_num = Node(table.pager.get(page_num)?).internal_child(index);
            }
        }
    }
}

fn find_in_leaf(table: &mut Table, page_num: u32, key: u32) -> Result<Cursor, Error> {
    let node = Node(table.pager.get(page_num)?);
    let num_cells = node.num_cells();

    let mut lo = 0u32;
    let mut hi = num_cells;
    while lo != hi {
        let mid = lo + (hi - lo) / 2;
        if node.leaf_key(mid) >= key {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    Ok(Cursor {
        page_num,
        cell_num: lo,
        end_of_table: num_cells == 0,
    })
}

/// Smallest index `i` in `[0, num_keys)` with `internal_key(i) >= key`; if
/// none qualifies, `num_keys` (meaning "descend into the right child").
pub(crate) fn find_child_index(table: &mut Table, page_num: u32, key: u32) -> Result<u32, Error> {
    let node = Node(table.pager.get(page_num)?);
    let mut lo = 0u32;
    let mut hi = node.num_keys();
    while lo != hi {
        let mid = lo + (hi - lo) / 2;
        if node.internal_key(mid) >= key {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Ok(lo)
}

/// Cursor at the smallest key in the table (or `end_of_table` if empty).
pub fn table_start(table: &mut Table) -> Result<Cursor, Error> {
    find(table, 0)
}

/// Copies the row bytes at the cursor's current position.
pub fn read_value(table: &mut Table, cursor: &Cursor) -> Result<[u8; ROW_SIZE], Error> {
    let node = Node(table.pager.get(cursor.page_num)?);
    Ok(node.leaf_value(cursor.cell_num).try_into().unwrap())
}

/// Moves the cursor to the next cell, following `next_leaf` across leaf
/// boundaries and setting `end_of_table` once the chain is exhausted.
pub fn advance(table: &mut Table, cursor: &mut Cursor) -> Result<(), Error> {
    let node = Node(table.pager.get(cursor.page_num)?);
    let num_cells = node.num_cells();
    let next_leaf = node.next_leaf();

    cursor.cell_num += 1;
    if cursor.cell_num < num_cells {
        return Ok(());
    }

    if next_leaf == 0 {
        cursor.end_of_table = true;
    } else {
        cursor.page_num = next_leaf;
        cursor.cell_num = 0;
    }
    Ok(())
}
