/// Postgres 저장소에서 사용하는 쿼리 모음

/// 리스팅 등록
pub const INSERT_LISTING: &str = r#"
    INSERT INTO listings (id, seller_id, item_id, listing_type, status, starting_price, current_price, buy_now_price, high_bidder_id, winning_amount, start_time, end_time, accepts_offers, min_offer_amount, shipping_cost, description, detail_images, payment_status, version, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
"#;

/// 리스팅 조회
pub const GET_LISTING: &str = "SELECT id, seller_id, item_id, listing_type, status, starting_price, current_price, buy_now_price, high_bidder_id, winning_amount, start_time, end_time, accepts_offers, min_offer_amount, shipping_cost, description, detail_images, payment_status, version, created_at FROM listings WHERE id = $1";

/// 같은 상품의 진행 중인 리스팅 조회
pub const GET_OPEN_LISTING_FOR_ITEM: &str = "SELECT id, seller_id, item_id, listing_type, status, starting_price, current_price, buy_now_price, high_bidder_id, winning_amount, start_time, end_time, accepts_offers, min_offer_amount, shipping_cost, description, detail_images, payment_status, version, created_at FROM listings WHERE item_id = $1 AND status IN ('SCHEDULED', 'ACTIVE')";

/// ACTIVE 리스팅 검색(필터는 NULL 이면 무시)
pub const SEARCH_LISTINGS: &str = r#"
    SELECT id, seller_id, item_id, listing_type, status, starting_price, current_price, buy_now_price, high_bidder_id, winning_amount, start_time, end_time, accepts_offers, min_offer_amount, shipping_cost, description, detail_images, payment_status, version, created_at
    FROM listings
    WHERE status = 'ACTIVE'
      AND ($1::text IS NULL OR listing_type = $1)
      AND ($2::uuid IS NULL OR seller_id = $2)
      AND ($3::bigint IS NULL OR current_price >= $3)
      AND ($4::bigint IS NULL OR current_price <= $4)
      AND ($5::boolean IS NULL OR (buy_now_price IS NOT NULL) = $5)
      AND ($6::timestamptz IS NULL OR (listing_type = 'AUCTION' AND end_time <= $6))
    ORDER BY
      CASE WHEN $7 = 'ENDING_SOONEST' THEN end_time END ASC,
      CASE WHEN $7 = 'PRICE_ASC' THEN current_price END ASC,
      CASE WHEN $7 = 'PRICE_DESC' THEN current_price END DESC,
      created_at DESC
"#;

/// 리스팅 CAS 갱신(version - 1 과 일치할 때만)
pub const UPDATE_LISTING_CAS: &str = r#"
    UPDATE listings
    SET status = $2, current_price = $3, buy_now_price = $4, high_bidder_id = $5,
        winning_amount = $6, end_time = $7, min_offer_amount = $8, shipping_cost = $9,
        description = $10, detail_images = $11, payment_status = $12, version = $13
    WHERE id = $1 AND version = $13 - 1
"#;

/// 마감 시간이 지난 ACTIVE/ENDED 경매 조회
pub const DUE_AUCTIONS: &str = "SELECT id, seller_id, item_id, listing_type, status, starting_price, current_price, buy_now_price, high_bidder_id, winning_amount, start_time, end_time, accepts_offers, min_offer_amount, shipping_cost, description, detail_images, payment_status, version, created_at FROM listings WHERE listing_type = 'AUCTION' AND status IN ('ACTIVE', 'ENDED') AND end_time <= $1 ORDER BY end_time ASC";

/// 시작 시간이 지난 SCHEDULED 리스팅을 ACTIVE 로 전환
pub const ACTIVATE_DUE_LISTINGS: &str = "UPDATE listings SET status = 'ACTIVE', version = version + 1 WHERE status = 'SCHEDULED' AND start_time <= $1";

/// 입찰 기록 추가
pub const INSERT_BID: &str = "INSERT INTO bids (id, listing_id, bidder_id, max_bid, placed_at) VALUES ($1, $2, $3, $4, $5)";

/// 입찰 이력 조회(기록 순서)
pub const GET_BIDS_FOR_LISTING: &str = r#"
    SELECT id, listing_id, bidder_id, max_bid, placed_at
    FROM bids
    WHERE listing_id = $1
    ORDER BY seq ASC
"#;

/// 입찰 수 조회
pub const COUNT_BIDS: &str = "SELECT COUNT(*) FROM bids WHERE listing_id = $1";

/// 가격 제안 등록
pub const INSERT_OFFER: &str = "INSERT INTO offers (id, listing_id, buyer_id, amount, status, counter_amount, expires_at, version, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)";

/// 가격 제안 조회
pub const GET_OFFER: &str = "SELECT id, listing_id, buyer_id, amount, status, counter_amount, expires_at, version, created_at FROM offers WHERE id = $1";

/// 리스팅의 모든 가격 제안 조회
pub const GET_OFFERS_FOR_LISTING: &str = "SELECT id, listing_id, buyer_id, amount, status, counter_amount, expires_at, version, created_at FROM offers WHERE listing_id = $1 ORDER BY created_at ASC";

/// 구매자의 진행 중인 제안 조회
pub const GET_OPEN_OFFER_FOR_BUYER: &str = "SELECT id, listing_id, buyer_id, amount, status, counter_amount, expires_at, version, created_at FROM offers WHERE listing_id = $1 AND buyer_id = $2 AND status IN ('PENDING', 'COUNTERED')";

/// 가격 제안 CAS 갱신
pub const UPDATE_OFFER_CAS: &str = r#"
    UPDATE offers
    SET status = $2, counter_amount = $3, expires_at = $4, version = $5
    WHERE id = $1 AND version = $5 - 1
"#;

/// 만료 시간이 지난 진행 중 제안 조회
pub const GET_EXPIRED_OPEN_OFFERS: &str = "SELECT id, listing_id, buyer_id, amount, status, counter_amount, expires_at, version, created_at FROM offers WHERE status IN ('PENDING', 'COUNTERED') AND expires_at <= $1";

/// 관심 목록 추가
pub const ADD_WATCH: &str = "INSERT INTO watchlist_entries (user_id, listing_id, created_at) VALUES ($1, $2, $3) ON CONFLICT (user_id, listing_id) DO NOTHING";

/// 관심 목록 제거
pub const REMOVE_WATCH: &str = "DELETE FROM watchlist_entries WHERE user_id = $1 AND listing_id = $2";

/// 리스팅을 관심 목록에 담은 사용자 조회
pub const GET_WATCHERS_OF: &str = "SELECT user_id FROM watchlist_entries WHERE listing_id = $1";

/// 사용자의 관심 목록 리스팅 조회
pub const GET_WATCHLIST_OF: &str = r#"
    SELECT l.id, l.seller_id, l.item_id, l.listing_type, l.status, l.starting_price, l.current_price, l.buy_now_price, l.high_bidder_id, l.winning_amount, l.start_time, l.end_time, l.accepts_offers, l.min_offer_amount, l.shipping_cost, l.description, l.detail_images, l.payment_status, l.version, l.created_at
    FROM watchlist_entries w
    JOIN listings l ON l.id = w.listing_id
    WHERE w.user_id = $1
    ORDER BY w.created_at DESC
"#;

/// 판매자 평가 등록(거래당 평가자 1회)
pub const INSERT_RATING: &str = "INSERT INTO seller_ratings (id, listing_id, seller_id, rater_id, positive, comment, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (listing_id, rater_id) DO NOTHING";

/// 판매자 평가 조회
pub const GET_RATINGS_FOR_SELLER: &str = "SELECT id, listing_id, seller_id, rater_id, positive, comment, created_at FROM seller_ratings WHERE seller_id = $1 ORDER BY created_at DESC";
