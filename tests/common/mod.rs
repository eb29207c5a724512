pub mod glb;
