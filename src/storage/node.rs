//! Typed byte-offset accessors over a 4096-byte page buffer.
//!
//! A [`Node`] is a thin view, not an owner: it borrows the page buffer handed
//! out by [`super::pager::Pager::get`] and reads/writes fixed fields at
//! known offsets. There is no dynamic allocation and no parsing into an
//! intermediate representation.
use crate::storage::pager::PAGE_SIZE;
use crate::storage::row::ROW_SIZE;

/// Sentinel for "no right child yet" during internal-node construction.
pub const INVALID_PAGE_NUM: u32 = 0xFFFF_FFFF;

// --- common header ---------------------------------------------------
const NODE_TYPE_OFFSET: usize = 0;
const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + 1;
const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + 1;
/// Bytes shared by every node before its type-specific header.
pub const COMMON_NODE_HEADER_SIZE: usize = PARENT_POINTER_OFFSET + 4;

// --- leaf header & cells ----------------------------------------------
const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + 4;
/// Bytes before the first cell of a leaf node.
pub const LEAF_NODE_HEADER_SIZE: usize = LEAF_NODE_NEXT_LEAF_OFFSET + 4;

const LEAF_NODE_KEY_SIZE: usize = 4;
const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
/// Bytes occupied by one `(key, row)` leaf cell.
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
/// Bytes left in a page for leaf cells once the header is subtracted.
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
/// Maximum cells a leaf can hold before it must split.
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

/// Cells assigned to the right (new) leaf after a split.
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
/// Cells assigned to the left (old) leaf after a split.
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// --- internal header & cells -------------------------------------------
const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize = INTERNAL_NODE_NUM_KEYS_OFFSET + 4;
/// Bytes before the first cell of an internal node.
pub const INTERNAL_NODE_HEADER_SIZE: usize = INTERNAL_NODE_RIGHT_CHILD_OFFSET + 4;

const INTERNAL_NODE_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_KEY_SIZE: usize = 4;
/// Bytes occupied by one `(child, key)` internal cell.
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;
/// Maximum keys an internal node can hold before it must split.
pub const INTERNAL_NODE_MAX_CELLS: usize =
    (PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE) / INTERNAL_NODE_CELL_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

impl NodeType {
    fn from_tag(tag: u8) -> NodeType {
        match tag {
            1 => NodeType::Internal,
            _ => NodeType::Leaf,
        }
    }

    fn tag(self) -> u8 {
        match self {
            NodeType::Internal => 1,
            NodeType::Leaf => 0,
        }
    }
}

/// A borrowed view over one page's bytes, with read/write accessors for
/// every field defined by the common, leaf, and internal layouts.
pub struct Node<'a>(pub &'a mut [u8; PAGE_SIZE]);

impl<'a> Node<'a> {
    fn u32_at(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.0[offset..offset + 4].try_into().unwrap())
    }

    fn set_u32_at(&mut self, offset: usize, value: u32) {
        self.0[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    // --- common header ---
    pub fn node_type(&self) -> NodeType {
        NodeType::from_tag(self.0[NODE_TYPE_OFFSET])
    }

    pub fn set_node_type(&mut self, ty: NodeType) {
        self.0[NODE_TYPE_OFFSET] = ty.tag();
    }

    pub fn is_root(&self) -> bool {
        self.0[IS_ROOT_OFFSET] != 0
    }

    pub fn set_is_root(&mut self, is_root: bool) {
        self.0[IS_ROOT_OFFSET] = is_root as u8;
    }

    pub fn parent_page_num(&self) -> u32 {
        self.u32_at(PARENT_POINTER_OFFSET)
    }

    pub fn set_parent_page_num(&mut self, page_num: u32) {
        self.set_u32_at(PARENT_POINTER_OFFSET, page_num);
    }

    // --- leaf header ---
    pub fn num_cells(&self) -> u32 {
        self.u32_at(LEAF_NODE_NUM_CELLS_OFFSET)
    }

    pub fn set_num_cells(&mut self, n: u32) {
        self.set_u32_at(LEAF_NODE_NUM_CELLS_OFFSET, n);
    }

    pub fn next_leaf(&self) -> u32 {
        self.u32_at(LEAF_NODE_NEXT_LEAF_OFFSET)
    }

    pub fn set_next_leaf(&mut self, page_num: u32) {
        self.set_u32_at(LEAF_NODE_NEXT_LEAF_OFFSET, page_num);
    }

    fn leaf_cell_offset(cell_num: u32) -> usize {
        LEAF_NODE_HEADER_SIZE + cell_num as usize * LEAF_NODE_CELL_SIZE
    }

    pub fn leaf_key(&self, cell_num: u32) -> u32 {
        self.u32_at(Self::leaf_cell_offset(cell_num))
    }

    pub fn set_leaf_key(&mut self, cell_num: u32, key: u32) {
        let off = Self::leaf_cell_offset(cell_num);
        self.set_u32_at(off, key);
    }

    pub fn leaf_value(&self, cell_num: u32) -> &[u8] {
        let off = Self::leaf_cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
        &self.0[off..off + LEAF_NODE_VALUE_SIZE]
    }

    pub fn set_leaf_value(&mut self, cell_num: u32, value: &[u8; ROW_SIZE]) {
        let off = Self::leaf_cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
        self.0[off..off + LEAF_NODE_VALUE_SIZE].copy_from_slice(value);
    }

    /// Copies cell `src` onto cell `dst` within the same leaf, key and
    /// value together. Used when shifting cells during insert/split.
    pub fn copy_leaf_cell(&mut self, src: u32, dst: u32) {
        let src_off = Self::leaf_cell_offset(src);
        let dst_off = Self::leaf_cell_offset(dst);
        self.0.copy_within(src_off..src_off + LEAF_NODE_CELL_SIZE, dst_off);
    }

    pub fn init_leaf(&mut self) {
        self.set_node_type(NodeType::Leaf);
        self.set_is_root(false);
        self.set_num_cells(0);
        self.set_next_leaf(0);
    }

    // --- internal header ---
    pub fn num_keys(&self) -> u32 {
        self.u32_at(INTERNAL_NODE_NUM_KEYS_OFFSET)
    }

    pub fn set_num_keys(&mut self, n: u32) {
        self.set_u32_at(INTERNAL_NODE_NUM_KEYS_OFFSET, n);
    }

    pub fn right_child(&self) -> u32 {
        self.u32_at(INTERNAL_NODE_RIGHT_CHILD_OFFSET)
    }

    pub fn set_right_child(&mut self, page_num: u32) {
        self.set_u32_at(INTERNAL_NODE_RIGHT_CHILD_OFFSET, page_num);
    }

    fn internal_cell_offset(cell_num: u32) -> usize {
        INTERNAL_NODE_HEADER_SIZE + cell_num as usize * INTERNAL_NODE_CELL_SIZE
    }

    pub fn internal_child_raw(&self, cell_num: u32) -> u32 {
        self.u32_at(Self::internal_cell_offset(cell_num))
    }

    pub fn set_internal_child_raw(&mut self, cell_num: u32, page_num: u32) {
        let off = Self::internal_cell_offset(cell_num);
        self.set_u32_at(off, page_num);
    }

    /// Left child for `cell_num < num_keys`; the right child pointer for
    /// `cell_num == num_keys`.
    pub fn internal_child(&self, cell_num: u32) -> u32 {
        if cell_num == self.num_keys() {
            self.right_child()
        } else {
            self.internal_child_raw(cell_num)
        }
    }

    pub fn set_internal_child(&mut self, cell_num: u32, page_num: u32) {
        if cell_num == self.num_keys() {
            self.set_right_child(page_num);
        } else {
            self.set_internal_child_raw(cell_num, page_num);
        }
    }

    pub fn internal_key(&self, cell_num: u32) -> u32 {
        let off = Self::internal_cell_offset(cell_num) + INTERNAL_NODE_CHILD_SIZE;
        self.u32_at(off)
    }

    pub fn set_internal_key(&mut self, cell_num: u32, key: u32) {
        let off = Self::internal_cell_offset(cell_num) + INTERNAL_NODE_CHILD_SIZE;
        self.set_u32_at(off, key);
    }

    pub fn init_internal(&mut self) {
        self.set_node_type(NodeType::Internal);
        self.set_is_root(false);
        self.set_num_keys(0);
        self.set_right_child(INVALID_PAGE_NUM);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_layout_constants() {
        assert_eq!(COMMON_NODE_HEADER_SIZE, 6);
        assert_eq!(LEAF_NODE_HEADER_SIZE, 14);
        assert_eq!(LEAF_NODE_CELL_SIZE, 297);
        assert_eq!(LEAF_NODE_SPACE_FOR_CELLS, 4082);
        assert_eq!(LEAF_NODE_MAX_CELLS, 13);
    }

    #[test]
    fn leaf_accessors_round_trip() {
        let mut buf = [0u8; PAGE_SIZE];
        let mut node = Node(&mut buf);
        node.init_leaf();
        node.set_num_cells(1);
        node.set_leaf_key(0, 42);
        let value = [7u8; ROW_SIZE];
        node.set_leaf_value(0, &value);
        assert_eq!(node.leaf_key(0), 42);
        assert_eq!(node.leaf_value(0), &value[..]);
    }

    #[test]
    fn internal_child_uses_right_child_at_num_keys() {
        let mut buf = [0u8; PAGE_SIZE];
        let mut node = Node(&mut buf);
        node.init_internal();
        node.set_num_keys(1);
        node.set_internal_child(0, 5);
        node.set_internal_key(0, 100);
        node.set_internal_child(1, 9);
        assert_eq!(node.internal_child(0), 5);
        assert_eq!(node.internal_child(1), 9);
        assert_eq!(node.right_child(), 9);
    }
}
