use crate::domain::listing::SeenListing;
use maud::{html, Markup, DOCTYPE};

pub fn subject_for(seen: &SeenListing) -> String {
    let title = if seen.listing.title.is_empty() {
        "New apartment listing"
    } else {
        seen.listing.title.as_str()
    };
    format!("🏠 {} · {}", title, seen.price_display())
}

fn detail_line(seen: &SeenListing) -> Option<String> {
    let l = &seen.listing;
    let parts: Vec<&str> = [&l.bedrooms, &l.bathrooms, &l.sqft]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" | "))
}

pub fn listing_email(seen: &SeenListing) -> Markup {
    let l = &seen.listing;

    html! {
        (DOCTYPE)
        html {
            body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;" {
                div style="max-width: 600px; margin: 0 auto; padding: 20px;" {
                    h2 style="color: #2c5aa0;" { (l.title) }
                    @if let Some(src) = &l.image_url {
                        img src=(src) alt="Apartment" style="width: 100%; max-width: 300px; border-radius: 8px;";
                    }
                    p style="color: #e74c3c; font-size: 20px; font-weight: bold;" { (seen.price_display()) }
                    @if !l.address.is_empty() {
                        p { strong { "Address: " } (l.address) }
                    }
                    @if let Some(details) = detail_line(seen) {
                        p { strong { "Details: " } (details) }
                    }
                    p {
                        a href=(l.detail_url) style="background-color: #2c5aa0; color: #fff; padding: 10px 20px; text-decoration: none; border-radius: 5px;" {
                            "View Full Listing"
                        }
                    }
                    hr style="border: none; border-top: 1px solid #ddd;";
                    p style="font-size: 0.8em; color: #999;" {
                        "First seen " (seen.first_seen_at.format("%Y-%m-%d %H:%M UTC"))
                    }
                }
            }
        }
    }
}
