// Domain layer: records and the ports the tracker talks to. No adapter code here.

pub mod model;
pub mod ports;
