pub mod content_tree;
