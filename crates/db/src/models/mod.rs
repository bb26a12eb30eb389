pub mod energy_production;
pub mod epc_project;
pub mod railway_site;
