pub mod cube_graph;
