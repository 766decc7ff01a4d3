mod cleanup;
mod decision;
mod metabolism;
mod movement;
mod turn_order;
