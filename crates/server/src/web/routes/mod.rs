pub mod site_routes;
