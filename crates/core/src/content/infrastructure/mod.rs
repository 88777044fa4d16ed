pub mod memory_tree;
